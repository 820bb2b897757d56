use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::time::Instant;

use egui::{Color32, ColorImage, TextureHandle};
use egui_extras::{Column, TableBuilder};
use log::{debug, warn};

use crate::client::cleanup::CleanupHandler;
use crate::client::submitter::Submitter;
use crate::client::Transport;
use crate::config::Config;
use crate::core::controller::{Controller, StateKind, Ticket, UploadMethod};
use crate::core::{filename, validation};
use crate::core::view::{GenreRow, ResultView};
use crate::models::{ClassificationResult, UploadDraft, AUDIO_EXTENSIONS};

const ACCENT: Color32 = Color32::from_rgb(0x93, 0x33, 0xea);
const BAR_COLOR: Color32 = Color32::from_rgb(0xc0, 0x84, 0xfc);
const ERROR_COLOR: Color32 = Color32::from_rgb(0xef, 0x44, 0x44);
const SUCCESS_COLOR: Color32 = Color32::from_rgb(0x22, 0xc5, 0x5e);

enum BgResult {
    UploadDone(Ticket, Result<ClassificationResult, String>),
    ArtworkDone(Ticket, Option<Vec<u8>>),
    CleanupDone(Result<(), String>),
    AudioSaved(Result<PathBuf, String>),
}

enum Cover {
    Missing,
    Pending(Vec<u8>),
    Loaded(TextureHandle),
}

pub struct GenreScopeApp {
    controller: Controller,
    submitter: Submitter,
    cleanup: CleanupHandler,
    transport: Arc<dyn Transport>,

    // Upload forms
    draft: UploadDraft,

    // Results
    cover: Cover,
    audio_open: bool,
    saving_audio: bool,
    status_msg: String,

    // Background tasks
    tx: mpsc::Sender<BgResult>,
    rx: mpsc::Receiver<BgResult>,
}

impl GenreScopeApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        transport: Arc<dyn Transport>,
        config: &Config,
    ) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());
        let (tx, rx) = mpsc::channel();

        Self {
            controller: Controller::new(config.pacing.pacing()),
            submitter: Submitter::new(transport.clone(), config.link.policy()),
            cleanup: CleanupHandler::new(transport.clone()),
            transport,
            draft: UploadDraft::default(),
            cover: Cover::Missing,
            audio_open: false,
            saving_audio: false,
            status_msg: String::new(),
            tx,
            rx,
        }
    }

    fn choose(&mut self, method: UploadMethod) {
        self.draft = UploadDraft::default();
        if method == UploadMethod::Link {
            self.draft.url = Some(String::new());
        }
        self.controller.choose(method);
    }

    fn start_upload(&mut self, ctx: &egui::Context) {
        let request = match self.submitter.prepare(&self.draft) {
            Ok(r) => r,
            Err(e) => {
                self.controller.set_error(e.to_string());
                return;
            }
        };
        let Some(ticket) = self.controller.begin_upload() else {
            return;
        };

        let submitter = self.submitter.clone();
        let tx = self.tx.clone();
        let ctx = ctx.clone();
        std::thread::spawn(move || {
            let result = submitter
                .send(&request)
                .map_err(|e| e.user_message());
            let _ = tx.send(BgResult::UploadDone(ticket, result));
            ctx.request_repaint();
        });
    }

    /// 커버 이미지를 미리 받아둔다. 완료되면 결과 화면으로 넘어갈 수 있다.
    fn fetch_artwork(&self, ctx: &egui::Context, ticket: Ticket, url: String) {
        let transport = self.transport.clone();
        let tx = self.tx.clone();
        let ctx = ctx.clone();
        std::thread::spawn(move || {
            let data = match transport.fetch_url(&url) {
                Ok(data) => Some(data),
                Err(e) => {
                    warn!("cover image {} unavailable: {}", url, e);
                    None
                }
            };
            let _ = tx.send(BgResult::ArtworkDone(ticket, data));
            ctx.request_repaint();
        });
    }

    fn start_reset(&mut self, ctx: &egui::Context) {
        match self.controller.request_reset() {
            Some(filename) => self.spawn_cleanup(ctx, filename),
            None => self.clear_session(),
        }
    }

    /// Back는 어느 화면에서든 처음으로 돌아간다. 결과가 있으면 먼저 삭제한다.
    fn go_back(&mut self, ctx: &egui::Context) {
        match self.controller.back() {
            Some(filename) => self.spawn_cleanup(ctx, filename),
            None => self.clear_session(),
        }
    }

    fn spawn_cleanup(&self, ctx: &egui::Context, filename: String) {
        let cleanup = self.cleanup.clone();
        let tx = self.tx.clone();
        let ctx = ctx.clone();
        std::thread::spawn(move || {
            let _ = tx.send(BgResult::CleanupDone(cleanup.discard(&filename)));
            ctx.request_repaint();
        });
    }

    /// 아무도 보지 않을 업로드 파일을 지운다.
    fn delete_orphan(&self, filename: String) {
        let cleanup = self.cleanup.clone();
        std::thread::spawn(move || {
            let _ = cleanup.delete(&filename);
        });
    }

    fn save_audio(&mut self, ctx: &egui::Context, filename: String) {
        let Some(dest) = rfd::FileDialog::new().set_file_name(&filename).save_file() else {
            return;
        };
        self.saving_audio = true;

        let transport = self.transport.clone();
        let tx = self.tx.clone();
        let ctx = ctx.clone();
        std::thread::spawn(move || {
            let result = (|| -> anyhow::Result<PathBuf> {
                let data = transport.fetch_audio(&filename)?;
                std::fs::write(&dest, data)?;
                Ok(dest)
            })();
            let _ = tx.send(BgResult::AudioSaved(result.map_err(|e| e.to_string())));
            ctx.request_repaint();
        });
    }

    fn clear_session(&mut self) {
        self.draft = UploadDraft::default();
        self.cover = Cover::Missing;
        self.audio_open = false;
        self.status_msg.clear();
    }

    fn process_bg_results(&mut self, ctx: &egui::Context) {
        while let Ok(result) = self.rx.try_recv() {
            match result {
                BgResult::UploadDone(ticket, Ok(result)) => {
                    let cover_url = result.cover_image_url.clone();
                    if let Some(orphan) =
                        self.controller
                            .upload_succeeded(ticket, result, Instant::now())
                    {
                        self.delete_orphan(orphan);
                        continue;
                    }
                    self.cover = Cover::Missing;
                    if cover_url.trim().is_empty() {
                        self.controller.mark_prepared(ticket);
                    } else {
                        self.fetch_artwork(ctx, ticket, cover_url);
                    }
                }
                BgResult::UploadDone(ticket, Err(message)) => {
                    self.controller.upload_failed(ticket, message);
                }
                BgResult::ArtworkDone(ticket, data) => {
                    if self.controller.active_ticket() != Some(ticket) {
                        debug!("dropping artwork for stale upload {:?}", ticket);
                        continue;
                    }
                    self.cover = data.map(Cover::Pending).unwrap_or(Cover::Missing);
                    self.controller.mark_prepared(ticket);
                }
                BgResult::CleanupDone(outcome) => {
                    self.controller.cleanup_finished(outcome);
                    self.clear_session();
                }
                BgResult::AudioSaved(result) => {
                    self.saving_audio = false;
                    self.status_msg = match result {
                        Ok(path) => format!("Saved to {}", path.display()),
                        Err(e) => format!("Download failed: {}", e),
                    };
                }
            }
        }
    }

    fn load_cover_texture(&mut self, ctx: &egui::Context) {
        let Cover::Pending(data) = &self.cover else {
            return;
        };
        self.cover = match image::load_from_memory(data) {
            Ok(img) => {
                let rgba = img.to_rgba8();
                let size = [rgba.width() as usize, rgba.height() as usize];
                let pixels = rgba.into_raw();
                let color_image = ColorImage::from_rgba_unmultiplied(size, &pixels);
                Cover::Loaded(ctx.load_texture("cover_art", color_image, Default::default()))
            }
            Err(e) => {
                warn!("cover image could not be decoded: {}", e);
                Cover::Missing
            }
        };
    }

    fn show_error(&self, ui: &mut egui::Ui) {
        if let Some(error) = self.controller.error() {
            ui.colored_label(ERROR_COLOR, error);
        }
    }

    fn show_initial(&mut self, ui: &mut egui::Ui) {
        ui.heading(egui::RichText::new("AI-Powered Music Genre Classifier").color(ACCENT).size(28.0));
        ui.add_space(8.0);
        ui.label(
            "Instantly categorize your music. Upload files or provide links to discover genres effortlessly.",
        );
        ui.add_space(16.0);
        if ui.button("Get Started").clicked() {
            self.controller.start();
        }
        self.show_error(ui);
    }

    fn show_choosing(&mut self, ui: &mut egui::Ui) {
        ui.heading("Choose Upload Method");
        ui.add_space(12.0);
        if ui.button("Upload Music File").clicked() {
            self.choose(UploadMethod::File);
        }
        if ui.button("Upload YouTube Link").clicked() {
            self.choose(UploadMethod::Link);
        }
        ui.add_space(12.0);
        self.back_button(ui);
    }

    fn show_file_upload(&mut self, ui: &mut egui::Ui) {
        ui.heading("Upload Your Music File");
        ui.add_space(12.0);

        if ui.button(self.draft.file_label().to_string()).clicked() {
            if let Some(file) = rfd::FileDialog::new()
                .add_filter("Audio", &AUDIO_EXTENSIONS)
                .pick_file()
            {
                let guess = filename::guess_from_path(&file);
                filename::fill_missing(&mut self.draft.song_name, &mut self.draft.artist, guess);
                self.draft.file = Some(file);
                self.controller.clear_error();
            }
        }
        self.metadata_fields(ui);
        self.show_error(ui);

        ui.horizontal(|ui| {
            if ui.button("Submit").clicked() {
                self.start_upload(ui.ctx());
            }
            self.back_button(ui);
        });
    }

    fn show_link_upload(&mut self, ui: &mut egui::Ui) {
        ui.heading("Enter YouTube Link");
        ui.add_space(12.0);

        let url = self.draft.url.get_or_insert_with(String::new);
        ui.add(egui::TextEdit::singleline(url).hint_text("Enter YouTube URL"));
        self.metadata_fields(ui);

        // 입력이 시작된 뒤에만 검증 메시지를 보여준다
        let policy = self.submitter.policy();
        let touched = self.draft.url.as_deref().is_some_and(|u| !u.is_empty())
            || !self.draft.song_name.is_empty()
            || !self.draft.artist.is_empty();
        if let (true, Err(e)) = (touched, validation::validate_draft(&self.draft, policy)) {
            ui.colored_label(ERROR_COLOR, e.to_string());
        }
        self.show_error(ui);

        let enabled = validation::can_submit(&self.draft, policy);
        ui.horizontal(|ui| {
            if ui
                .add_enabled(enabled, egui::Button::new("Submit"))
                .clicked()
            {
                self.start_upload(ui.ctx());
            }
            self.back_button(ui);
        });
    }

    fn metadata_fields(&mut self, ui: &mut egui::Ui) {
        ui.add(egui::TextEdit::singleline(&mut self.draft.song_name).hint_text("Song Name"));
        ui.add(egui::TextEdit::singleline(&mut self.draft.artist).hint_text("Artist"));
    }

    fn back_button(&mut self, ui: &mut egui::Ui) {
        if ui
            .add_enabled(self.controller.can_go_back(), egui::Button::new("Back"))
            .clicked()
        {
            self.go_back(ui.ctx());
        }
    }

    fn show_progress(&mut self, ui: &mut egui::Ui, text: &str) {
        ui.add_space(40.0);
        ui.spinner();
        ui.label(egui::RichText::new(text).color(ACCENT).size(18.0));
        ui.add_space(16.0);
        self.back_button(ui);
    }

    fn show_uploaded(&mut self, ui: &mut egui::Ui) {
        ui.add_space(40.0);
        ui.label(
            egui::RichText::new("Uploaded Successfully!")
                .color(SUCCESS_COLOR)
                .size(22.0),
        );
        ui.add_space(16.0);
        self.back_button(ui);
    }

    fn show_results(&mut self, ui: &mut egui::Ui) {
        let Some(view) = self
            .controller
            .result()
            .map(|r| ResultView::new(r, self.transport.base_url()))
        else {
            return;
        };

        ui.heading(egui::RichText::new(&view.title).strong().size(26.0));
        ui.label(egui::RichText::new(&view.byline).color(BAR_COLOR));
        ui.add_space(8.0);

        show_cover(ui, &self.cover);
        ui.add_space(8.0);

        if !view.genres.is_empty() {
            ui.label(egui::RichText::new("Predicted Genres").color(BAR_COLOR).size(18.0));
            genre_table(ui, &view.genres);
            ui.add_space(8.0);
            genre_chart(ui, &view.genres);
        }

        if let Some(audio_url) = &view.audio_url {
            let label = if self.audio_open { "Close" } else { "Open" };
            if ui.button(label).clicked() {
                self.audio_open = !self.audio_open;
            }
            if self.audio_open {
                ui.horizontal(|ui| {
                    ui.hyperlink_to("Play in browser", audio_url);
                    if ui
                        .add_enabled(!self.saving_audio, egui::Button::new("Download File"))
                        .clicked()
                    {
                        self.save_audio(ui.ctx(), view.filename.clone());
                    }
                    if self.saving_audio {
                        ui.spinner();
                    }
                });
            }
        }
        if !self.status_msg.is_empty() {
            ui.label(&self.status_msg);
        }

        ui.add_space(12.0);
        let pending = self.controller.cleanup_pending();
        ui.horizontal(|ui| {
            if ui
                .add_enabled(!pending, egui::Button::new("Start Over"))
                .clicked()
            {
                self.start_reset(ui.ctx());
            }
            if pending {
                ui.spinner();
            }
        });
        self.show_error(ui);
    }
}

fn show_cover(ui: &mut egui::Ui, cover: &Cover) {
    if let Cover::Loaded(texture) = cover {
        let size = texture.size_vec2();
        let scale = (240.0 / size.x).min(240.0 / size.y).min(1.0);
        ui.image(egui::load::SizedTexture::new(texture.id(), size * scale));
        return;
    }
    let (rect, _) = ui.allocate_exact_size(egui::vec2(240.0, 240.0), egui::Sense::hover());
    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 6.0, Color32::from_gray(55));
    painter.text(
        rect.center(),
        egui::Align2::CENTER_CENTER,
        "No Cover Image",
        egui::FontId::proportional(16.0),
        Color32::from_gray(170),
    );
}

fn genre_table(ui: &mut egui::Ui, rows: &[GenreRow]) {
    TableBuilder::new(ui)
        .striped(true)
        .vscroll(false)
        .column(Column::exact(24.0))
        .column(Column::remainder())
        .header(20.0, |mut header| {
            header.col(|ui| {
                ui.strong("#");
            });
            header.col(|ui| {
                ui.strong("Genre");
            });
        })
        .body(|mut body| {
            for row in rows {
                body.row(18.0, |mut table_row| {
                    table_row.col(|ui| {
                        ui.label(row.rank.to_string());
                    });
                    table_row.col(|ui| {
                        ui.label(&row.label);
                    });
                });
            }
        });
}

/// Vertical confidence bars on a 0-100% axis.
fn genre_chart(ui: &mut egui::Ui, rows: &[GenreRow]) {
    let (rect, _) = ui.allocate_exact_size(egui::vec2(360.0, 200.0), egui::Sense::hover());
    let painter = ui.painter_at(rect);
    let plot = egui::Rect::from_min_max(
        rect.min + egui::vec2(40.0, 8.0),
        rect.max - egui::vec2(8.0, 24.0),
    );

    for pct in [0, 25, 50, 75, 100] {
        let y = plot.bottom() - plot.height() * pct as f32 / 100.0;
        painter.hline(plot.x_range(), y, egui::Stroke::new(1.0, Color32::from_gray(70)));
        painter.text(
            egui::pos2(plot.left() - 6.0, y),
            egui::Align2::RIGHT_CENTER,
            format!("{}%", pct),
            egui::FontId::proportional(11.0),
            Color32::GRAY,
        );
    }

    if rows.is_empty() {
        return;
    }
    let slot = plot.width() / rows.len() as f32;
    for (i, row) in rows.iter().enumerate() {
        let center = plot.left() + slot * (i as f32 + 0.5);
        let half = slot * 0.2;
        let top = plot.bottom() - plot.height() * row.fraction;
        let bar = egui::Rect::from_min_max(
            egui::pos2(center - half, top),
            egui::pos2(center + half, plot.bottom()),
        );
        painter.rect_filled(bar, 2.0, BAR_COLOR);
        painter.text(
            egui::pos2(center, plot.bottom() + 4.0),
            egui::Align2::CENTER_TOP,
            &row.name,
            egui::FontId::proportional(12.0),
            Color32::GRAY,
        );
    }
}

impl eframe::App for GenreScopeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_bg_results(ctx);

        let now = Instant::now();
        self.controller.tick(now);
        if let Some(wait) = self.controller.next_wakeup(now) {
            ctx.request_repaint_after(wait);
        }
        if self.controller.kind() == StateKind::Results {
            self.load_cover_texture(ctx);
        }

        // Top panel: service endpoint
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new("Genrescope").strong().color(ACCENT));
                ui.separator();
                ui.label(format!("Server: {}", self.transport.base_url()));
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.vertical_centered(|ui| match self.controller.kind() {
                    StateKind::Initial => self.show_initial(ui),
                    StateKind::ChoosingMethod => self.show_choosing(ui),
                    StateKind::FileUpload => self.show_file_upload(ui),
                    StateKind::LinkUpload => self.show_link_upload(ui),
                    StateKind::Uploading => self.show_progress(ui, "Processing your upload..."),
                    StateKind::Uploaded => self.show_uploaded(ui),
                    StateKind::Analyzing => self.show_progress(ui, "Analyzing your music..."),
                    StateKind::Results => self.show_results(ui),
                });
            });
        });
    }
}
