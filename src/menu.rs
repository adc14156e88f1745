/// Navigation request passed along with a listbox repaint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListAction {
    None,
    Up,
    Down,
}

/// Selection state of a scrolling list: which line is highlighted and which
/// slice of lines is on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listbox {
    items: Vec<String>,
    visible: usize,
    selected: usize,
    top: usize,
}

/// Lines shown at once on the tester's display.
pub const VISIBLE_LINES: usize = 4;

impl Listbox {
    pub fn new(items: Vec<String>) -> Self {
        Self {
            items,
            visible: VISIBLE_LINES,
            selected: 0,
            top: 0,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Swap in a new item list. The selection survives only if the list is
    /// unchanged.
    pub fn set_items(&mut self, items: Vec<String>) {
        if items != self.items {
            self.items = items;
            self.selected = 0;
            self.top = 0;
        }
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Index of the first line on screen.
    pub fn top(&self) -> usize {
        self.top
    }

    /// Lines currently on screen, paired with their index.
    pub fn window(&self) -> impl Iterator<Item = (usize, &str)> {
        self.items
            .iter()
            .enumerate()
            .skip(self.top)
            .take(self.visible)
            .map(|(i, s)| (i, s.as_str()))
    }

    /// Move the selection. Stops at either end; scrolls to keep the
    /// selection on screen.
    pub fn navigate(&mut self, action: ListAction) {
        match action {
            ListAction::None => {}
            ListAction::Up => {
                self.selected = self.selected.saturating_sub(1);
            }
            ListAction::Down => {
                if self.selected + 1 < self.items.len() {
                    self.selected += 1;
                }
            }
        }
        if self.selected < self.top {
            self.top = self.selected;
        } else if self.selected >= self.top + self.visible {
            self.top = self.selected + 1 - self.visible;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> Listbox {
        Listbox::new((0..n).map(|i| format!("item {i}")).collect())
    }

    #[test]
    fn test_clamps_at_ends() {
        let mut l = numbered(3);
        l.navigate(ListAction::Up);
        assert_eq!(l.selected(), 0);
        for _ in 0..5 {
            l.navigate(ListAction::Down);
        }
        assert_eq!(l.selected(), 2);
    }

    #[test]
    fn test_scrolls_to_follow_selection() {
        let mut l = numbered(12);
        for _ in 0..4 {
            l.navigate(ListAction::Down);
        }
        assert_eq!(l.selected(), 4);
        assert_eq!(l.top(), 1);
        let shown: Vec<usize> = l.window().map(|(i, _)| i).collect();
        assert_eq!(shown, vec![1, 2, 3, 4]);

        for _ in 0..3 {
            l.navigate(ListAction::Up);
        }
        assert_eq!(l.selected(), 1);
        assert_eq!(l.top(), 1);
        l.navigate(ListAction::Up);
        assert_eq!(l.top(), 0);
    }

    #[test]
    fn test_set_items_keeps_selection_for_same_list() {
        let mut l = numbered(5);
        l.navigate(ListAction::Down);
        l.set_items(numbered(5).items().to_vec());
        assert_eq!(l.selected(), 1);
        l.set_items(vec!["other".into()]);
        assert_eq!(l.selected(), 0);
    }

    #[test]
    fn test_empty_list_is_inert() {
        let mut l = Listbox::empty();
        l.navigate(ListAction::Down);
        l.navigate(ListAction::Up);
        assert_eq!(l.selected(), 0);
        assert_eq!(l.window().count(), 0);
    }
}
