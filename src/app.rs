use crate::clipboard;
use crate::commands::{self, ChatContext};
use crate::config::Config;
use crate::logger;
use crate::sink::{Pane, StreamJob, UiEvent};
use crate::stream::{ChatRequest, StreamOutcome};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use std::fs;
use std::time::Duration;

// Run the UI event loop on the main thread (blocking)
pub fn run_ui_main_thread(
    cfg: Config,
    endpoint: Option<String>,
    job_tx: Sender<StreamJob>,
    ui_rx: Receiver<UiEvent>,
) {
    let app = HelpHandApp::new(cfg, endpoint, job_tx, ui_rx);
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("HelpHand")
            .with_inner_size([500.0, 600.0])
            .with_always_on_top(),
        ..Default::default()
    };
    logger::log("Main UI: starting event loop");
    match eframe::run_native("HelpHand", native_options, Box::new(|_cc| Box::new(app))) {
        Ok(_) => logger::log("Main UI: event loop exited"),
        Err(e) => logger::log(&format!("Main UI error: {}", e)),
    }
}

struct PaneBuffer {
    text: String,
    stick_to_bottom: bool,
    busy: bool,
}

impl PaneBuffer {
    fn new() -> Self {
        Self {
            text: String::new(),
            stick_to_bottom: false,
            busy: false,
        }
    }
}

struct HelpHandApp {
    cfg: Config,
    endpoint: Option<String>,
    job_tx: Sender<StreamJob>,
    ui_rx: Receiver<UiEvent>,
    translate: PaneBuffer,
    summary: PaneBuffer,
    chat: PaneBuffer,
    chat_input: String,
    status: String,
    fonts_set: bool,
}

impl HelpHandApp {
    fn new(
        cfg: Config,
        endpoint: Option<String>,
        job_tx: Sender<StreamJob>,
        ui_rx: Receiver<UiEvent>,
    ) -> Self {
        let status = match &endpoint {
            Some(url) => format!("Using endpoint {url}"),
            None => "No endpoint reachable; actions disabled.".to_string(),
        };
        Self {
            cfg,
            endpoint,
            job_tx,
            ui_rx,
            translate: PaneBuffer::new(),
            summary: PaneBuffer::new(),
            chat: PaneBuffer::new(),
            chat_input: String::new(),
            status,
            fonts_set: false,
        }
    }

    fn pane_mut(&mut self, pane: Pane) -> &mut PaneBuffer {
        match pane {
            Pane::Translate => &mut self.translate,
            Pane::Summary => &mut self.summary,
            Pane::Chat => &mut self.chat,
        }
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Clear(pane) => {
                    let buf = self.pane_mut(pane);
                    buf.text.clear();
                    buf.stick_to_bottom = false;
                }
                UiEvent::Append(pane, text) => self.pane_mut(pane).text.push_str(&text),
                UiEvent::ScrollToEnd(pane) => self.pane_mut(pane).stick_to_bottom = true,
                UiEvent::StreamEnded(pane, outcome) => {
                    self.pane_mut(pane).busy = false;
                    self.status = match outcome {
                        StreamOutcome::Done => "Ready.".to_string(),
                        StreamOutcome::Exhausted => {
                            "Request failed after retries; see log.txt.".to_string()
                        }
                    };
                }
            }
        }
    }

    fn submit(&mut self, pane: Pane, request: ChatRequest) {
        self.pane_mut(pane).busy = true;
        self.status = "Working...".to_string();
        if self.job_tx.send(StreamJob { pane, request }).is_err() {
            self.pane_mut(pane).busy = false;
            self.status = "Worker unavailable.".to_string();
            logger::log("UI: job channel closed");
        }
    }

    fn on_translate(&mut self) {
        let Some(text) = clipboard::read_clipboard_string() else {
            self.status = "Failed to read clipboard.".to_string();
            logger::log("Translate: failed to read clipboard");
            return;
        };
        if text.trim().is_empty() {
            self.status = "Clipboard is empty.".to_string();
            return;
        }
        logger::log(&format!("Translate: {} chars from clipboard", text.len()));
        let request = commands::translate_request(&text, &self.cfg.reply_lang);
        self.submit(Pane::Translate, request);
    }

    fn on_summarize(&mut self) {
        let Some(text) = clipboard::read_clipboard_string() else {
            self.status = "Failed to read clipboard.".to_string();
            logger::log("Summarize: failed to read clipboard");
            return;
        };
        if text.trim().is_empty() {
            self.status = "Clipboard is empty.".to_string();
            return;
        }
        logger::log(&format!("Summarize: {} chars from clipboard", text.len()));
        let request = commands::summarize_request(&text, &self.cfg.reply_lang);
        self.submit(Pane::Summary, request);
    }

    fn on_send(&mut self) {
        let typed = self.chat_input.trim().to_string();
        let composed = commands::compose_chat_input(
            &ChatContext {
                previous_answer: &self.chat.text,
                translation: &self.translate.text,
                summary: &self.summary.text,
            },
            &typed,
            &self.cfg.reply_lang,
        );
        // The streamed reply replaces the pane, so the User line only shows
        // until the first fragment arrives; same behavior for each turn.
        self.chat.text.push_str(&format!("User: {composed}\n"));
        self.chat_input.clear();
        let request = commands::chat_request(composed);
        self.submit(Pane::Chat, request);
    }

    fn on_clear_all(&mut self) {
        self.translate.text.clear();
        self.summary.text.clear();
        self.chat.text.clear();
        self.chat_input.clear();
    }

    fn setup_fonts(&mut self, ctx: &egui::Context) {
        if self.fonts_set {
            return;
        }
        self.fonts_set = true;
        let candidates = [
            r"C:\Windows\Fonts\msyh.ttc",
            r"C:\Windows\Fonts\msyh.ttf",
            r"C:\Windows\Fonts\msyhbd.ttf",
            r"C:\Windows\Fonts\simsun.ttc",
            r"C:\Windows\Fonts\simhei.ttf",
        ];
        let mut loaded = None;
        for path in candidates {
            if let Ok(bytes) = fs::read(path) {
                loaded = Some(bytes);
                logger::log(&format!("Loaded CJK font: {}", path));
                break;
            }
        }
        if let Some(bytes) = loaded {
            let mut fonts = egui::FontDefinitions::default();
            fonts
                .font_data
                .insert("cjk".to_owned(), egui::FontData::from_owned(bytes));
            fonts
                .families
                .entry(egui::FontFamily::Proportional)
                .or_default()
                .insert(0, "cjk".to_owned());
            fonts
                .families
                .entry(egui::FontFamily::Monospace)
                .or_default()
                .insert(0, "cjk".to_owned());
            ctx.set_fonts(fonts);
            logger::log("Applied CJK font to egui");
        } else {
            logger::log("No CJK font found; text may render as squares");
        }
    }
}

fn pane_section(ui: &mut egui::Ui, title: &str, buf: &mut PaneBuffer, height: f32) {
    ui.label(egui::RichText::new(title).strong());
    egui::ScrollArea::vertical()
        .id_source(title)
        .max_height(height)
        .auto_shrink([false, false])
        .stick_to_bottom(buf.stick_to_bottom)
        .show(ui, |ui| {
            ui.add(
                egui::TextEdit::multiline(&mut buf.text)
                    .desired_rows(6)
                    .desired_width(f32::INFINITY),
            );
        });
}

impl eframe::App for HelpHandApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Wake up periodically so we can poll the channel even without user events
        ctx.request_repaint_after(Duration::from_millis(120));
        self.setup_fonts(ctx);
        self.drain_events();

        let ready = self.endpoint.is_some();

        egui::TopBottomPanel::bottom("controls").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let input_width = (ui.available_width() - 140.0).max(80.0);
                ui.add(
                    egui::TextEdit::singleline(&mut self.chat_input)
                        .desired_width(input_width)
                        .hint_text("Ask about the panes..."),
                );
                if ui
                    .add_enabled(ready && !self.chat.busy, egui::Button::new("Send"))
                    .clicked()
                {
                    self.on_send();
                }
                if ui.button("Clear All").clicked() {
                    self.on_clear_all();
                }
            });
            ui.label(&self.status);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let section_height = ((ui.available_height() - 110.0) / 3.0).max(60.0);

            pane_section(ui, "Translate", &mut self.translate, section_height);
            if ui
                .add_enabled(
                    ready && !self.translate.busy,
                    egui::Button::new("Translate clipboard"),
                )
                .clicked()
            {
                self.on_translate();
            }
            ui.separator();

            pane_section(ui, "Summary", &mut self.summary, section_height);
            if ui
                .add_enabled(
                    ready && !self.summary.busy,
                    egui::Button::new("Summarize clipboard"),
                )
                .clicked()
            {
                self.on_summarize();
            }
            ui.separator();

            pane_section(ui, "Chat", &mut self.chat, section_height);
        });
    }
}
