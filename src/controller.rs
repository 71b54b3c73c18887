use crate::dom::{ElementId, WidgetView};
use crate::image_file::ImageFile;
use crate::prediction::{PredictRequest, PredictResponse, PredictionClient, PredictionError};
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::instrument;

pub const SELECT_IMAGE_MESSAGE: &str = "Please select an image";
pub const PROCESSING_FAILED_MESSAGE: &str = "An error occurred while processing the image";
pub const CONNECTION_ERROR_PREFIX: &str = "Server connection error: ";
pub const READ_FAILED_PREFIX: &str = "Could not read the selected file: ";

const DRAG_OVER_CLASS: &str = "drag-over";

/// Renders a coordinate like a browser's number-to-text conversion, where
/// negative zero prints as `0`.
fn format_coordinate(value: f64) -> String {
    (value + 0.0).to_string()
}

/// User interactions the widget page forwards to the controller.
#[derive(Debug, Clone)]
pub enum WidgetEvent {
    FilesSelected(Vec<ImageFile>),
    DragOver,
    DragLeave,
    Drop(Vec<ImageFile>),
    SearchClicked,
}

#[derive(Debug, Clone)]
struct Selection {
    generation: u64,
    image: ImageFile,
}

pub struct UploadController<V: WidgetView, C: PredictionClient> {
    view: Mutex<V>,
    client: C,
    selection: Mutex<Option<Selection>>,
    generation: AtomicU64,
}

/// Holds the busy state for one submission; dropping it hides the loader and
/// re-enables search on every exit path.
struct BusyGuard<'a, V: WidgetView> {
    view: &'a Mutex<V>,
}

impl<'a, V: WidgetView> BusyGuard<'a, V> {
    fn enter(view: &'a Mutex<V>) -> Self {
        let mut v = view.lock();
        v.set_visible(ElementId::Loader, true);
        v.set_disabled(ElementId::SearchButton, true);
        v.set_visible(ElementId::ErrorMessage, false);
        v.set_visible(ElementId::ResultImage, false);
        v.set_visible(ElementId::Coordinates, false);
        v.set_visible(ElementId::Placeholder, true);
        drop(v);

        Self { view }
    }
}

impl<V: WidgetView> Drop for BusyGuard<'_, V> {
    fn drop(&mut self) {
        let mut v = self.view.lock();
        v.set_visible(ElementId::Loader, false);
        v.set_disabled(ElementId::SearchButton, false);
    }
}

impl<V: WidgetView, C: PredictionClient> UploadController<V, C> {
    pub fn new(view: V, client: C) -> Self {
        Self {
            view: Mutex::new(view),
            client,
            selection: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn view(&self) -> MutexGuard<'_, V> {
        self.view.lock()
    }

    pub fn selected_image(&self) -> Option<ImageFile> {
        self.selection.lock().as_ref().map(|s| s.image.clone())
    }

    pub async fn dispatch(&self, event: WidgetEvent) {
        match event {
            WidgetEvent::FilesSelected(files) => {
                if let Some(file) = files.into_iter().next() {
                    self.handle_file(file).await;
                }
            }
            WidgetEvent::DragOver => {
                self.view
                    .lock()
                    .set_class(ElementId::UploadArea, DRAG_OVER_CLASS, true);
            }
            WidgetEvent::DragLeave => {
                self.view
                    .lock()
                    .set_class(ElementId::UploadArea, DRAG_OVER_CLASS, false);
            }
            WidgetEvent::Drop(files) => {
                self.view
                    .lock()
                    .set_class(ElementId::UploadArea, DRAG_OVER_CLASS, false);
                if let Some(file) = files.into_iter().next() {
                    self.handle_file(file).await;
                }
            }
            WidgetEvent::SearchClicked => self.submit().await,
        }
    }

    #[instrument(skip(self, file), fields(file = %file.name(), mime_type = %file.mime_type()))]
    pub async fn handle_file(&self, file: ImageFile) {
        if !file.is_image() {
            tracing::debug!("Rejected non-image file");
            self.show_error(SELECT_IMAGE_MESSAGE);
            return;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.selection.lock() = Some(Selection {
            generation,
            image: file.clone(),
        });

        match file.read_as_data_url().await {
            Ok(data_url) => {
                let mut v = self.view.lock();
                v.set_src(ElementId::PreviewImage, &data_url);
                v.set_visible(ElementId::PreviewImage, true);
                v.set_visible(ElementId::UploadPrompt, false);
                v.set_disabled(ElementId::SearchButton, false);
                v.set_visible(ElementId::ErrorMessage, false);
            }
            Err(e) => {
                tracing::warn!("Failed to decode selected file: {}", e);
                let cleared = {
                    let mut selection = self.selection.lock();
                    let current = selection.as_ref().map(|s| s.generation) == Some(generation);
                    if current {
                        *selection = None;
                    }
                    current
                };
                if cleared {
                    self.reset_preview();
                }
                self.show_error(&format!("{}{}", READ_FAILED_PREFIX, e));
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn submit(&self) {
        let Some(image) = self.selected_image() else {
            self.show_error(SELECT_IMAGE_MESSAGE);
            return;
        };

        let _busy = BusyGuard::enter(&self.view);
        let model = self
            .view
            .lock()
            .value(ElementId::ModelSelect)
            .unwrap_or_default();

        let image_data = match image.read_bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Failed to read selected file: {}", e);
                self.show_error(&format!("{}{}", READ_FAILED_PREFIX, e));
                return;
            }
        };

        let request = PredictRequest {
            file_name: image.name().to_string(),
            mime_type: image.mime_type().to_string(),
            image_data,
            model,
        };

        match self.client.predict(request).await {
            Ok(PredictResponse::Ok {
                result_image,
                coordinates,
            }) => {
                tracing::info!(x = coordinates.x, y = coordinates.y, "Prediction received");
                let mut v = self.view.lock();
                v.set_src(ElementId::ResultImage, &result_image);
                v.set_visible(ElementId::ResultImage, true);
                v.set_visible(ElementId::Placeholder, false);
                v.set_text(ElementId::CoordX, &format_coordinate(coordinates.x));
                v.set_text(ElementId::CoordY, &format_coordinate(coordinates.y));
                v.set_visible(ElementId::Coordinates, true);
            }
            Ok(PredictResponse::Failed { error }) => {
                tracing::warn!("Prediction failed: {:?}", error);
                self.show_error(error.as_deref().unwrap_or(PROCESSING_FAILED_MESSAGE));
            }
            Err(e) => {
                tracing::error!("Prediction request failed: {:?}", e);
                self.report_transport_error(&e);
            }
        }
    }

    /// Back to the empty drop zone once nothing is selected.
    fn reset_preview(&self) {
        let mut v = self.view.lock();
        v.set_visible(ElementId::PreviewImage, false);
        v.set_visible(ElementId::UploadPrompt, true);
        v.set_disabled(ElementId::SearchButton, true);
    }

    fn report_transport_error(&self, error: &PredictionError) {
        self.show_error(&format!("{}{}", CONNECTION_ERROR_PREFIX, error));
    }

    pub fn show_error(&self, message: &str) {
        let mut v = self.view.lock();
        v.set_text(ElementId::ErrorMessage, message);
        v.set_visible(ElementId::ErrorMessage, true);
    }

    pub fn hide_error(&self) {
        self.view.lock().set_visible(ElementId::ErrorMessage, false);
    }
}
