use log::{debug, info, trace};

use crate::menu::{ListAction, Listbox};

/// Side of the square progress-dot grid.
pub const GRID_SIDE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Black,
    DarkGray,
    DarkBlue,
    DarkGreen,
    DarkMagenta,
    DarkYellow,
    Green,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icon {
    Chip,
    Check,
    Error,
    Drum(u8),
}

/// The two text lines on the test screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLine {
    /// Running test name, then the verdict.
    Headline,
    /// Failure detail.
    Detail,
}

/// Drawing primitives the operator needs from the display.
pub trait FrontPanel {
    /// Clear the screen to an empty dialog with a title bar.
    fn paint_dialog(&mut self, title: &str);

    /// Draw `menu` after it has handled `action`.
    fn paint_listbox(&mut self, menu: &Listbox, action: ListAction);

    fn message_box(&mut self, title: &str, text: &str, icon: Icon);

    /// Paint one cell of the progress grid.
    fn fill_dot(&mut self, x: usize, y: usize, color: Color);

    fn paint_status(&mut self, line: StatusLine, text: &str);

    /// Draw the status icon, replacing whatever icon was there.
    fn draw_icon(&mut self, icon: Icon);
}

/// The socket's supply switch.
pub trait PowerSwitch {
    fn set_power(&mut self, on: bool);
}

/// Headless panel that logs what would be drawn and keeps the dot grid so
/// it can be printed afterwards.
pub struct ConsolePanel {
    grid: [[Color; GRID_SIDE]; GRID_SIDE],
    headline: String,
    detail: String,
}

impl ConsolePanel {
    pub fn new() -> Self {
        Self {
            grid: [[Color::Black; GRID_SIDE]; GRID_SIDE],
            headline: String::new(),
            detail: String::new(),
        }
    }

    pub fn headline(&self) -> &str {
        &self.headline
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// The dot grid as text, one character per dot.
    pub fn grid_ascii(&self) -> String {
        let mut out = String::with_capacity(GRID_SIDE * (GRID_SIDE + 1));
        for row in &self.grid {
            for c in row {
                out.push(match c {
                    Color::Black => ' ',
                    Color::DarkGray => '.',
                    Color::DarkBlue => '0',
                    Color::DarkGreen => '1',
                    Color::DarkMagenta => '2',
                    Color::DarkYellow => '3',
                    Color::Green => '4',
                });
            }
            out.push('\n');
        }
        out
    }
}

impl Default for ConsolePanel {
    fn default() -> Self {
        Self::new()
    }
}

impl FrontPanel for ConsolePanel {
    fn paint_dialog(&mut self, title: &str) {
        info!("== {title} ==");
    }

    fn paint_listbox(&mut self, menu: &Listbox, _action: ListAction) {
        for (i, line) in menu.window() {
            let mark = if i == menu.selected() { '>' } else { ' ' };
            info!("{mark} {line}");
        }
    }

    fn message_box(&mut self, title: &str, text: &str, icon: Icon) {
        info!("[{icon:?}] {title}: {text}");
    }

    fn fill_dot(&mut self, x: usize, y: usize, color: Color) {
        trace!("dot {x},{y} {color:?}");
        if let Some(cell) = self.grid.get_mut(y).and_then(|row| row.get_mut(x)) {
            *cell = color;
        }
    }

    fn paint_status(&mut self, line: StatusLine, text: &str) {
        match line {
            StatusLine::Headline => self.headline = text.to_string(),
            StatusLine::Detail => self.detail = text.to_string(),
        }
        if !text.trim().is_empty() {
            info!("{text}");
        }
    }

    fn draw_icon(&mut self, icon: Icon) {
        trace!("icon {icon:?}");
    }
}

/// Power switch that only reports what it would do.
#[derive(Debug, Default)]
pub struct ConsolePower {
    on: bool,
}

impl ConsolePower {
    pub fn is_on(&self) -> bool {
        self.on
    }
}

impl PowerSwitch for ConsolePower {
    fn set_power(&mut self, on: bool) {
        debug!("socket power {}", if on { "on" } else { "off" });
        self.on = on;
    }
}
