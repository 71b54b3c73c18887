use crate::config::Config;
use crate::controller::{UploadController, WidgetEvent};
use crate::dom::{ElementId, MemoryView};
use crate::image_file::{decode_data_url, ImageFile};
use crate::prediction::HttpPredictionClient;
use anyhow::{anyhow, bail, Context};
use clap::Parser;
use std::path::PathBuf;

/// Pick an image, submit it to the prediction service and report the result.
#[derive(Debug, Parser)]
#[command(name = "predict_widget", version)]
pub struct Args {
    /// Image to upload
    pub image: PathBuf,
    /// Model identifier, one of the configured widget models
    #[arg(long)]
    pub model: Option<String>,
    /// Where to write the annotated image returned by the service
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub async fn start_app(config: Config, args: Args) -> anyhow::Result<()> {
    let client = HttpPredictionClient::new(&config.prediction_service);

    match client.health().await {
        Ok(true) => tracing::info!(
            "Prediction service at {} is healthy",
            config.prediction_service.get_address()
        ),
        Ok(false) => tracing::warn!("Prediction service reports itself unhealthy"),
        Err(e) => tracing::warn!("Health check failed: {}", e),
    }

    let view = MemoryView::new(&config.widget.models, &config.widget.default_model);
    let controller = UploadController::new(view, client);

    if let Some(model) = &args.model {
        if !controller
            .view()
            .select_option(ElementId::ModelSelect, model)
        {
            bail!(
                "unknown model `{}`, expected one of {:?}",
                model,
                config.widget.models
            );
        }
    }

    controller
        .dispatch(WidgetEvent::FilesSelected(vec![ImageFile::from_path(
            &args.image,
        )]))
        .await;
    if let Some(error) = controller.view().visible_error() {
        bail!("{}", error);
    }

    controller.dispatch(WidgetEvent::SearchClicked).await;

    let (x, y, result_image) = {
        let view = controller.view();
        if let Some(error) = view.visible_error() {
            tracing::error!("Prediction failed: {}", error);
            bail!("{}", error);
        }
        (
            view.text(ElementId::CoordX).to_string(),
            view.text(ElementId::CoordY).to_string(),
            view.src(ElementId::ResultImage).map(str::to_string),
        )
    };

    tracing::info!(x = %x, y = %y, image = %args.image.display(), "Predicted coordinates");

    if let Some(output) = &args.output {
        let result_image =
            result_image.ok_or_else(|| anyhow!("service returned no result image"))?;
        let (mime_type, bytes) = decode_data_url(&result_image)
            .context("result image is not an inline data URI")?;
        tokio::fs::write(output, bytes)
            .await
            .with_context(|| format!("failed to write {}", output.display()))?;
        tracing::info!("Wrote {} result to {}", mime_type, output.display());
    }

    Ok(())
}
