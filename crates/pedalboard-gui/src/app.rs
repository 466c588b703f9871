//! Main application state and UI.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use egui::{CentralPanel, Color32, Context, RichText, TopBottomPanel, vec2};
use parking_lot::Mutex;
use pedalboard_core::{AudioGraph, Board, BoardSettings};

use crate::audio_io::{self, AudioOutput, MicrophoneInput, SharedGraph, StreamOptions};
use crate::canvas;
use crate::error::AppError;
use crate::keyboard::{KeyboardSource, NOTES, is_sharp, note_for_key};

/// Messages kept in the status bar.
const MESSAGE_HISTORY: usize = 6;

/// What feeds the board's input pedal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum InputChoice {
    /// Nothing spliced in; the starter oscillator drives the chain.
    #[default]
    None,
    /// The on-screen / computer keyboard tone source.
    Keyboard,
    /// A capture device, by name.
    Device(String),
}

impl InputChoice {
    /// Parses a `--input` value. `keyboard` selects the tone source.
    pub fn from_arg(arg: &str) -> Self {
        if arg.eq_ignore_ascii_case("keyboard") {
            Self::Keyboard
        } else {
            Self::Device(arg.to_string())
        }
    }

    /// Text for the input picker.
    pub fn label(&self) -> &str {
        match self {
            Self::None => "None",
            Self::Keyboard => "Keyboard",
            Self::Device(name) => name,
        }
    }
}

/// The desktop pedalboard.
pub struct PedalboardApp {
    settings: BoardSettings,
    options: StreamOptions,
    graph: SharedGraph,
    board: Board,
    output: Option<AudioOutput>,
    microphone: Option<MicrophoneInput>,
    keyboard: Option<KeyboardSource>,
    input: InputChoice,
    input_devices: Vec<String>,
    /// Note held with the mouse on the on-screen keyboard.
    mouse_note: Option<usize>,
    audio_error: Option<String>,
    messages: VecDeque<String>,
}

impl PedalboardApp {
    /// Create the application, open the output stream and lay out the starter board.
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        settings: BoardSettings,
        options: StreamOptions,
    ) -> Self {
        let graph = Arc::new(Mutex::new(AudioGraph::new(f64::from(options.sample_rate))));
        let mut app = Self {
            board: Board::new(settings.clone()),
            settings,
            options,
            graph,
            output: None,
            microphone: None,
            keyboard: None,
            input: InputChoice::None,
            input_devices: Vec::new(),
            mouse_note: None,
            audio_error: None,
            messages: VecDeque::new(),
        };

        if let Err(e) = app.start_audio() {
            tracing::error!(error = %e, "audio output unavailable, board is silent");
            app.audio_error = Some(e.to_string());
            app.rebuild_board();
        }
        app.refresh_input_devices();

        if let Some(name) = app.options.input_device.clone() {
            app.switch_input(InputChoice::from_arg(&name));
        }
        app
    }

    /// Opens the output stream on a fresh graph and rebuilds the board in it.
    /// The current graph and board stay in place if the stream cannot start.
    fn start_audio(&mut self) -> Result<(), AppError> {
        let (output, graph) = AudioOutput::open(&self.options)?;
        self.stop_audio();
        self.output = Some(output);
        self.graph = graph;
        self.rebuild_board();
        Ok(())
    }

    /// Stop audio by dropping stream handles and the sources living in the graph.
    fn stop_audio(&mut self) {
        self.microphone = None;
        self.keyboard = None;
        self.mouse_note = None;
        self.output = None;
    }

    fn rebuild_board(&mut self) {
        let starter = Board::starter(self.settings.clone(), &mut *self.graph.lock());
        self.board = match starter {
            Ok(board) => board,
            Err(e) => {
                self.push_message(format!("could not build starter board: {e}"));
                Board::new(self.settings.clone())
            }
        };
        self.input = InputChoice::None;
    }

    fn refresh_input_devices(&mut self) {
        match audio_io::input_device_names() {
            Ok(names) => self.input_devices = names,
            Err(e) => {
                tracing::warn!(error = %e, "could not list input devices");
                self.input_devices.clear();
            }
        }
    }

    /// Creates the chosen source and splices it into the board.
    fn select_input(&mut self, choice: InputChoice) -> Result<(), AppError> {
        let source = match &choice {
            InputChoice::None => return Ok(()),
            InputChoice::Keyboard => {
                let keyboard = KeyboardSource::new(&mut *self.graph.lock())?;
                let node = keyboard.output();
                self.drop_keyboard();
                self.keyboard = Some(keyboard);
                self.microphone = None;
                node
            }
            InputChoice::Device(name) => {
                let mic = MicrophoneInput::open(&self.graph, Some(name), self.options.buffer_size)?;
                let node = mic.node();
                self.microphone = Some(mic);
                self.drop_keyboard();
                node
            }
        };
        self.mouse_note = None;

        let pedal = self.board.splice_input(source, &mut *self.graph.lock())?;
        tracing::info!(input = choice.label(), %pedal, "input spliced");
        self.input = choice;
        Ok(())
    }

    fn drop_keyboard(&mut self) {
        if let Some(keyboard) = self.keyboard.take() {
            keyboard.dispose(&mut self.graph.lock());
        }
    }

    fn switch_input(&mut self, choice: InputChoice) {
        let label = choice.label().to_string();
        if let Err(e) = self.select_input(choice) {
            tracing::warn!(error = %e, input = %label, "input unavailable");
            self.push_message(format!("input '{label}': {e}"));
        }
    }

    fn push_message(&mut self, message: String) {
        if self.messages.len() == MESSAGE_HISTORY {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    /// Plays the keyboard source from computer keys.
    fn handle_note_keys(&mut self, ctx: &Context) {
        let Some(keyboard) = self.keyboard.as_mut() else {
            return;
        };
        let events = ctx.input(|i| i.events.clone());
        let mut graph = self.graph.lock();
        for event in events {
            if let egui::Event::Key {
                key,
                pressed,
                repeat: false,
                ..
            } = event
                && let Some(note) = note_for_key(key)
            {
                let result = if pressed {
                    keyboard.press(&mut graph, note)
                } else {
                    keyboard.release_note(&mut graph, note)
                };
                if let Err(e) = result {
                    tracing::warn!(error = %e, note, "keyboard note failed");
                }
            }
        }
    }

    /// Render the header/toolbar.
    fn render_header(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading(
                RichText::new("PEDALBOARD")
                    .color(Color32::from_rgb(100, 180, 255))
                    .strong(),
            );

            ui.add_space(20.0);
            ui.label("Input");

            let mut picked = None;
            egui::ComboBox::from_id_salt("input_selector")
                .selected_text(self.input.label())
                .width(200.0)
                .show_ui(ui, |ui| {
                    if ui
                        .selectable_label(self.input == InputChoice::Keyboard, "Keyboard")
                        .clicked()
                    {
                        picked = Some(InputChoice::Keyboard);
                    }
                    for name in &self.input_devices {
                        let choice = InputChoice::Device(name.clone());
                        if ui.selectable_label(self.input == choice, name).clicked() {
                            picked = Some(choice);
                        }
                    }
                });
            if ui.small_button("⟳").on_hover_text("Rescan input devices").clicked() {
                self.refresh_input_devices();
            }
            if let Some(choice) = picked {
                self.switch_input(choice);
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let running = self.output.as_ref().is_some_and(|o| !o.is_paused());
                let status_color = if running {
                    Color32::from_rgb(80, 200, 80)
                } else {
                    Color32::from_rgb(200, 80, 80)
                };
                ui.label(RichText::new("●").color(status_color).size(12.0));

                let mut toggle = None;
                if let Some(output) = &self.output {
                    ui.label(
                        RichText::new(format!("{} @ {} Hz", output.device(), output.sample_rate()))
                            .small(),
                    );
                    let text = if output.is_paused() { "Resume" } else { "Suspend" };
                    if ui.button(text).clicked() {
                        toggle = Some(!output.is_paused());
                    }
                }
                if let Some(paused) = toggle
                    && let Some(output) = self.output.as_mut()
                    && let Err(e) = output.set_paused(paused)
                {
                    self.audio_error = Some(e.to_string());
                }

                let mut retry = false;
                if let Some(ref error) = self.audio_error {
                    ui.label(
                        RichText::new(error)
                            .color(Color32::from_rgb(220, 100, 100))
                            .small(),
                    );
                    retry = ui.small_button("Retry").clicked();
                }
                if retry {
                    match self.start_audio() {
                        Ok(()) => self.audio_error = None,
                        Err(e) => self.audio_error = Some(e.to_string()),
                    }
                }
            });
        });
    }

    /// Render the on-screen keyboard. Holding a key with the mouse plays it.
    fn render_keyboard(&mut self, ui: &mut egui::Ui) {
        let mut down = None;
        ui.horizontal(|ui| {
            ui.spacing_mut().item_spacing.x = 2.0;
            for (note, (name, _)) in NOTES.iter().enumerate() {
                let (fill, text, size) = if is_sharp(note) {
                    (Color32::BLACK, Color32::WHITE, vec2(25.0, 90.0))
                } else {
                    (Color32::WHITE, Color32::BLACK, vec2(35.0, 100.0))
                };
                let key = egui::Button::new(RichText::new(*name).color(text).small())
                    .fill(fill)
                    .min_size(size);
                if ui.add(key).is_pointer_button_down_on() {
                    down = Some(note);
                }
            }
        });

        if down == self.mouse_note {
            return;
        }
        self.mouse_note = down;
        let Some(keyboard) = self.keyboard.as_mut() else {
            return;
        };
        let mut graph = self.graph.lock();
        let result = match down {
            Some(note) => keyboard.press(&mut graph, note),
            None => keyboard.release(&mut graph),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "keyboard note failed");
        }
    }

    /// Render the status bar.
    fn render_status_bar(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(
                RichText::new(format!(
                    "{} pedals · {} cables",
                    self.board.pedal_count(),
                    self.board.cable_count()
                ))
                .small(),
            );
            if let Some(last) = self.messages.back() {
                ui.separator();
                ui.label(
                    RichText::new(last)
                        .color(Color32::from_rgb(220, 160, 60))
                        .small(),
                )
                .on_hover_ui(|ui| {
                    for message in &self.messages {
                        ui.label(message);
                    }
                });
            }
        });
    }
}

impl eframe::App for PedalboardApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.handle_note_keys(ctx);

        ctx.request_repaint_after(Duration::from_millis(16)); // ~60fps cap

        // Header
        TopBottomPanel::top("header").show(ctx, |ui| {
            ui.add_space(4.0);
            self.render_header(ui);
            ui.add_space(4.0);
        });

        // Status bar
        TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.add_space(2.0);
            self.render_status_bar(ui);
            ui.add_space(2.0);
        });

        if self.keyboard.is_some() {
            TopBottomPanel::bottom("keyboard").show(ctx, |ui| {
                ui.add_space(4.0);
                self.render_keyboard(ui);
                ui.add_space(4.0);
            });
        }

        // Board
        CentralPanel::default()
            .frame(egui::Frame::default())
            .show(ctx, |ui| {
                let errors = canvas::show(ui, &mut self.board, &self.graph);
                for e in errors {
                    self.push_message(e.to_string());
                }
            });

        for fault in self.board.take_audio_faults() {
            self.push_message(fault.to_string());
        }
        if self.board.is_dirty() {
            self.board.mark_clean();
            ctx.request_repaint();
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.stop_audio();
        self.graph.lock().close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_arg_parsing() {
        assert_eq!(InputChoice::from_arg("Keyboard"), InputChoice::Keyboard);
        assert_eq!(
            InputChoice::from_arg("USB"),
            InputChoice::Device("USB".to_string())
        );
    }

    #[test]
    fn input_labels() {
        assert_eq!(InputChoice::default().label(), "None");
        assert_eq!(InputChoice::Keyboard.label(), "Keyboard");
        assert_eq!(InputChoice::Device("Mic".to_string()).label(), "Mic");
    }
}
