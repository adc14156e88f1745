//! Operator workflow: device, variant and speed menus, the socket prompt,
//! the running test and its results.
//!
//! ```text
//! MainMenu ──▶ [VariantMenu] ──▶ SpeedMenu ──▶ AwaitingSocket ──▶ Testing ──▶ Results
//!                                    ▲                              ▲           │
//!                                    └──────────── back ────────────┼───────────┤
//!                                                                   └─ action ──┘
//! ```
//!
//! The variant menu only appears for chips that have variants, and back
//! from the speed menu skips it the same way. Input never leaves `Testing`;
//! only the job finishing, or the worker going away, does.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::chip::MemChip;
use crate::config::TesterConfig;
use crate::dispatch::{Dispatcher, Job};
use crate::driver::TestResult;
use crate::error::{Error, Result};
use crate::input::InputEvent;
use crate::menu::{ListAction, Listbox};
use crate::panel::{FrontPanel, Icon, PowerSwitch, StatusLine};
use crate::visual::Visualizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorState {
    MainMenu,
    VariantMenu,
    SpeedMenu,
    AwaitingSocket,
    Testing,
    Results,
}

const DRUM_FRAMES: u8 = 4;

/// Cycles the busy icon while a test runs. Purely cosmetic.
#[derive(Debug)]
struct DrumAnimation {
    period: Duration,
    frame: u8,
    next: Option<Instant>,
}

impl DrumAnimation {
    fn new(period: Duration) -> Self {
        Self {
            period,
            frame: 0,
            next: None,
        }
    }

    fn start(&mut self, now: Instant) {
        self.frame = 0;
        self.next = Some(now + self.period);
    }

    fn stop(&mut self) {
        self.next = None;
    }

    /// The frame to draw, if one is due.
    fn tick(&mut self, now: Instant) -> Option<u8> {
        let due = self.next?;
        if now < due {
            return None;
        }
        self.frame = (self.frame + 1) % DRUM_FRAMES;
        self.next = Some(now + self.period);
        Some(self.frame)
    }
}

/// The interactive side of the tester.
pub struct Operator<P: FrontPanel, W: PowerSwitch> {
    config: TesterConfig,
    chips: Vec<Arc<dyn MemChip>>,
    dispatcher: Dispatcher,
    panel: P,
    power: W,
    state: OperatorState,
    main_menu: Listbox,
    variant_menu: Listbox,
    speed_menu: Listbox,
    visualizer: Visualizer,
    drums: DrumAnimation,
    last_result: Option<TestResult>,
}

impl<P: FrontPanel, W: PowerSwitch> Operator<P, W> {
    pub fn new(
        config: TesterConfig,
        chips: Vec<Arc<dyn MemChip>>,
        dispatcher: Dispatcher,
        panel: P,
        power: W,
    ) -> Self {
        let names = chips.iter().map(|c| c.info().name.to_string()).collect();
        let drums = DrumAnimation::new(config.animation_period);
        Self {
            config,
            chips,
            dispatcher,
            panel,
            power,
            state: OperatorState::MainMenu,
            main_menu: Listbox::new(names),
            variant_menu: Listbox::empty(),
            speed_menu: Listbox::empty(),
            visualizer: Visualizer::new(),
            drums,
            last_result: None,
        }
    }

    /// Put up the device menu. Call once before feeding events.
    pub fn start(&mut self) {
        self.power.set_power(false);
        self.show_main_menu();
    }

    pub fn state(&self) -> OperatorState {
        self.state
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }

    pub fn power(&self) -> &W {
        &self.power
    }

    pub fn last_result(&self) -> Option<TestResult> {
        self.last_result
    }

    pub fn main_menu(&self) -> &Listbox {
        &self.main_menu
    }

    pub fn variant_menu(&self) -> &Listbox {
        &self.variant_menu
    }

    pub fn speed_menu(&self) -> &Listbox {
        &self.speed_menu
    }

    /// Chip highlighted in the device menu.
    pub fn selected_chip(&self) -> &Arc<dyn MemChip> {
        &self.chips[self.main_menu.selected()]
    }

    pub fn handle(&mut self, event: InputEvent) -> Result<()> {
        match event {
            InputEvent::Increment => self.wheel(ListAction::Down),
            InputEvent::Decrement => self.wheel(ListAction::Up),
            InputEvent::Action => self.button_action()?,
            InputEvent::Back => self.button_back(),
        }
        Ok(())
    }

    /// Per-iteration housekeeping while a test runs: progress map, test
    /// name, animation and result pickup. Never blocks.
    pub fn poll_status(&mut self) -> Result<()> {
        if self.state != OperatorState::Testing {
            return Ok(());
        }

        let chip = Arc::clone(self.selected_chip());
        let snap = self.dispatcher.progress().snapshot();
        self.visualizer.update(&mut self.panel, snap, chip.info());

        // Markers are sent before the result, so draining after the pickup
        // sees every marker of a finished job.
        let finished = match self.dispatcher.try_result() {
            Ok(result) => result,
            Err(e) => {
                self.abort_test(chip.as_ref(), &e);
                return Err(e);
            }
        };
        while let Some(test) = self.dispatcher.try_marker() {
            self.panel.paint_status(StatusLine::Headline, test.name());
        }

        match finished {
            Some(result) => {
                self.stop_ram_test(chip.as_ref());
                self.show_results(chip.as_ref(), result);
            }
            None => {
                if let Some(frame) = self.drums.tick(Instant::now()) {
                    self.panel.draw_icon(Icon::Drum(frame));
                }
            }
        }
        Ok(())
    }

    fn set_state(&mut self, next: OperatorState) {
        debug!("operator {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn wheel(&mut self, action: ListAction) {
        let menu = match self.state {
            OperatorState::MainMenu => &mut self.main_menu,
            OperatorState::VariantMenu => &mut self.variant_menu,
            OperatorState::SpeedMenu => &mut self.speed_menu,
            _ => return,
        };
        menu.navigate(action);
        self.panel.paint_listbox(menu, action);
    }

    fn button_action(&mut self) -> Result<()> {
        match self.state {
            OperatorState::MainMenu => {
                if self.selected_chip().info().has_variants() {
                    self.set_state(OperatorState::VariantMenu);
                    self.show_variant_menu();
                } else {
                    self.set_state(OperatorState::SpeedMenu);
                    self.show_speed_menu();
                }
            }
            OperatorState::VariantMenu => {
                self.set_state(OperatorState::SpeedMenu);
                self.show_speed_menu();
            }
            OperatorState::SpeedMenu => {
                self.panel.message_box(
                    "Place Chip in Socket",
                    "Turn on external supply afterwards, if used.",
                    Icon::Chip,
                );
                self.set_state(OperatorState::AwaitingSocket);
            }
            OperatorState::AwaitingSocket | OperatorState::Results => {
                self.set_state(OperatorState::Testing);
                self.show_test_screen();
                self.start_ram_test()?;
            }
            OperatorState::Testing => {}
        }
        Ok(())
    }

    fn button_back(&mut self) {
        match self.state {
            OperatorState::MainMenu | OperatorState::Testing => {}
            OperatorState::VariantMenu => {
                self.set_state(OperatorState::MainMenu);
                self.show_main_menu();
            }
            OperatorState::SpeedMenu => {
                if self.selected_chip().info().has_variants() {
                    self.set_state(OperatorState::VariantMenu);
                    self.show_variant_menu();
                } else {
                    self.set_state(OperatorState::MainMenu);
                    self.show_main_menu();
                }
            }
            OperatorState::AwaitingSocket | OperatorState::Results => {
                self.set_state(OperatorState::SpeedMenu);
                self.show_speed_menu();
            }
        }
    }

    fn show_main_menu(&mut self) {
        self.panel.paint_dialog("Select Device");
        self.panel.paint_listbox(&self.main_menu, ListAction::None);
    }

    fn show_variant_menu(&mut self) {
        let variants = self.selected_chip().info().variants.unwrap_or_default();
        self.variant_menu
            .set_items(variants.iter().map(|s| s.to_string()).collect());
        self.panel.paint_dialog("Select Variant");
        self.panel.paint_listbox(&self.variant_menu, ListAction::None);
    }

    fn show_speed_menu(&mut self) {
        let grades = self.selected_chip().info().speed_grades;
        self.speed_menu
            .set_items(grades.iter().map(|s| s.to_string()).collect());
        self.panel.paint_dialog("Select Speed Grade");
        self.panel.paint_listbox(&self.speed_menu, ListAction::None);
    }

    fn show_test_screen(&mut self) {
        self.panel.paint_dialog("Testing...");
        Visualizer::clear(&mut self.panel);
        self.visualizer.reset();
        self.dispatcher.progress().reset();
        self.panel.paint_status(StatusLine::Headline, "");
        self.panel.paint_status(StatusLine::Detail, "");
        self.panel.draw_icon(Icon::Drum(0));
        self.drums.start(Instant::now());
    }

    fn start_ram_test(&mut self) -> Result<()> {
        let chip = Arc::clone(self.selected_chip());
        let info = *chip.info();
        let variant = if info.has_variants() {
            self.variant_menu.selected()
        } else {
            0
        };

        self.power.set_power(true);
        if !self.config.power_settle.is_zero() {
            thread::sleep(self.config.power_settle);
        }
        chip.configure(self.speed_menu.selected(), variant);

        info!(
            "starting test of {} at {}",
            info.name,
            info.speed_grades
                .get(self.speed_menu.selected())
                .copied()
                .unwrap_or("?")
        );
        let job = Job::AllRamTests {
            addr_size: info.mem_size,
            bits: info.bits,
        };
        if let Err(e) = self.dispatcher.submit(Arc::clone(&chip), job) {
            self.abort_test(chip.as_ref(), &e);
            return Err(e);
        }
        Ok(())
    }

    fn stop_ram_test(&mut self, chip: &dyn MemChip) {
        self.drums.stop();
        chip.release();
        self.power.set_power(false);
    }

    /// Tear down a test the worker cannot finish. Lands on the results
    /// screen with no result, so the chip is released and unpowered.
    fn abort_test(&mut self, chip: &dyn MemChip, err: &Error) {
        warn!("{}: test aborted: {err}", chip.info().name);
        self.stop_ram_test(chip);
        self.set_state(OperatorState::Results);
        self.last_result = None;
        self.panel.draw_icon(Icon::Error);
        self.panel.paint_status(StatusLine::Detail, "Tester fault");
    }

    fn show_results(&mut self, chip: &dyn MemChip, result: TestResult) {
        self.set_state(OperatorState::Results);
        self.last_result = Some(result);

        if result.is_pass() {
            info!("{}: passed", chip.info().name);
            self.panel.paint_status(StatusLine::Headline, "Passed!");
            self.panel.draw_icon(Icon::Check);
            return;
        }

        self.panel.draw_icon(Icon::Error);
        let text = if chip.info().bits == 4 {
            let lanes: String = (0..4)
                .rev()
                .map(|lane| if result.lane_failed(lane) { '1' } else { '0' })
                .collect();
            format!("Failed {lanes}")
        } else {
            "Failed".to_string()
        };
        info!("{}: {}", chip.info().name, text);
        self.panel.paint_status(StatusLine::Detail, &text);
    }
}
