#[cfg(feature = "gui")]
mod app;

#[cfg(feature = "gui")]
pub fn launch(config: crate::config::Config) -> anyhow::Result<()> {
    let transport = std::sync::Arc::new(crate::client::http::HttpTransport::new(&config.server)?);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([900.0, 720.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Genrescope",
        options,
        Box::new(move |cc| Ok(Box::new(app::GenreScopeApp::new(cc, transport, &config)))),
    )
    .map_err(|e| anyhow::anyhow!("GUI를 시작할 수 없습니다: {}", e))
}
