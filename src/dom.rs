use std::collections::{BTreeSet, HashMap};

/// Elements of the widget page the controller is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementId {
    UploadArea,
    FileInput,
    UploadPrompt,
    PreviewImage,
    ResultArea,
    Placeholder,
    ResultImage,
    Coordinates,
    CoordX,
    CoordY,
    SearchButton,
    Loader,
    ErrorMessage,
    ModelSelect,
}

impl ElementId {
    pub const ALL: [ElementId; 14] = [
        ElementId::UploadArea,
        ElementId::FileInput,
        ElementId::UploadPrompt,
        ElementId::PreviewImage,
        ElementId::ResultArea,
        ElementId::Placeholder,
        ElementId::ResultImage,
        ElementId::Coordinates,
        ElementId::CoordX,
        ElementId::CoordY,
        ElementId::SearchButton,
        ElementId::Loader,
        ElementId::ErrorMessage,
        ElementId::ModelSelect,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ElementId::UploadArea => "uploadArea",
            ElementId::FileInput => "fileInput",
            ElementId::UploadPrompt => "upload-content",
            ElementId::PreviewImage => "previewImage",
            ElementId::ResultArea => "resultArea",
            ElementId::Placeholder => "placeholder",
            ElementId::ResultImage => "resultImage",
            ElementId::Coordinates => "coordinates",
            ElementId::CoordX => "coordX",
            ElementId::CoordY => "coordY",
            ElementId::SearchButton => "searchBtn",
            ElementId::Loader => "loader",
            ElementId::ErrorMessage => "errorMessage",
            ElementId::ModelSelect => "modelSelect",
        }
    }
}

/// The page markup as seen by the controller. Implementations never create
/// elements, they only mutate the ones named by [`ElementId`].
pub trait WidgetView {
    fn set_visible(&mut self, id: ElementId, visible: bool);
    fn set_text(&mut self, id: ElementId, text: &str);
    fn set_src(&mut self, id: ElementId, src: &str);
    fn set_disabled(&mut self, id: ElementId, disabled: bool);
    fn set_class(&mut self, id: ElementId, class: &str, enabled: bool);
    fn value(&self, id: ElementId) -> Option<String>;
}

#[derive(Debug, Clone, Default)]
struct ElementState {
    visible: bool,
    disabled: bool,
    text: String,
    src: Option<String>,
    value: Option<String>,
    options: Vec<String>,
    classes: BTreeSet<String>,
}

/// In-memory rendition of the widget page, starting in the state the markup
/// ships with: prompt and placeholder shown, everything else hidden, search
/// disabled until a preview exists.
#[derive(Debug, Clone)]
pub struct MemoryView {
    elements: HashMap<ElementId, ElementState>,
}

impl MemoryView {
    pub fn new(models: &[String], default_model: &str) -> Self {
        let mut elements: HashMap<ElementId, ElementState> = ElementId::ALL
            .iter()
            .map(|id| {
                let visible = !matches!(
                    id,
                    ElementId::PreviewImage
                        | ElementId::ResultImage
                        | ElementId::Coordinates
                        | ElementId::Loader
                        | ElementId::ErrorMessage
                );
                (
                    *id,
                    ElementState {
                        visible,
                        ..Default::default()
                    },
                )
            })
            .collect();

        if let Some(button) = elements.get_mut(&ElementId::SearchButton) {
            button.disabled = true;
        }
        if let Some(select) = elements.get_mut(&ElementId::ModelSelect) {
            select.options = models.to_vec();
            select.value = Some(default_model.to_string());
        }

        Self { elements }
    }

    /// Picks a model selector option. Values outside the option set are refused.
    pub fn select_option(&mut self, id: ElementId, value: &str) -> bool {
        let element = self.element_mut(id);
        if !element.options.iter().any(|option| option == value) {
            return false;
        }
        element.value = Some(value.to_string());
        true
    }

    pub fn options(&self, id: ElementId) -> &[String] {
        self.elements
            .get(&id)
            .map(|e| e.options.as_slice())
            .unwrap_or_default()
    }

    pub fn is_visible(&self, id: ElementId) -> bool {
        self.elements.get(&id).is_some_and(|e| e.visible)
    }

    pub fn is_disabled(&self, id: ElementId) -> bool {
        self.elements.get(&id).is_some_and(|e| e.disabled)
    }

    pub fn text(&self, id: ElementId) -> &str {
        self.elements
            .get(&id)
            .map(|e| e.text.as_str())
            .unwrap_or_default()
    }

    pub fn src(&self, id: ElementId) -> Option<&str> {
        self.elements.get(&id).and_then(|e| e.src.as_deref())
    }

    pub fn has_class(&self, id: ElementId, class: &str) -> bool {
        self.elements
            .get(&id)
            .is_some_and(|e| e.classes.contains(class))
    }

    /// Error text when the error area is showing.
    pub fn visible_error(&self) -> Option<&str> {
        self.is_visible(ElementId::ErrorMessage)
            .then(|| self.text(ElementId::ErrorMessage))
    }

    fn element_mut(&mut self, id: ElementId) -> &mut ElementState {
        self.elements.entry(id).or_default()
    }
}

impl WidgetView for MemoryView {
    fn set_visible(&mut self, id: ElementId, visible: bool) {
        tracing::trace!(element = id.as_str(), visible, "visibility");
        self.element_mut(id).visible = visible;
    }

    fn set_text(&mut self, id: ElementId, text: &str) {
        tracing::trace!(element = id.as_str(), text, "text");
        self.element_mut(id).text = text.to_string();
    }

    fn set_src(&mut self, id: ElementId, src: &str) {
        tracing::trace!(element = id.as_str(), len = src.len(), "src");
        self.element_mut(id).src = Some(src.to_string());
    }

    fn set_disabled(&mut self, id: ElementId, disabled: bool) {
        tracing::trace!(element = id.as_str(), disabled, "disabled");
        self.element_mut(id).disabled = disabled;
    }

    fn set_class(&mut self, id: ElementId, class: &str, enabled: bool) {
        let classes = &mut self.element_mut(id).classes;
        if enabled {
            classes.insert(class.to_string());
        } else {
            classes.remove(class);
        }
    }

    fn value(&self, id: ElementId) -> Option<String> {
        self.elements.get(&id).and_then(|e| e.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn models() -> Vec<String> {
        vec!["allData_v2".to_string(), "cnn_M_20x_k_4".to_string()]
    }

    #[test]
    fn test_initial_markup_state() {
        let view = MemoryView::new(&models(), "allData_v2");

        assert!(view.is_visible(ElementId::UploadPrompt));
        assert!(view.is_visible(ElementId::Placeholder));
        assert!(!view.is_visible(ElementId::PreviewImage));
        assert!(!view.is_visible(ElementId::ResultImage));
        assert!(!view.is_visible(ElementId::Loader));
        assert!(view.is_disabled(ElementId::SearchButton));
        assert_eq!(view.visible_error(), None);
        assert_eq!(
            view.value(ElementId::ModelSelect).as_deref(),
            Some("allData_v2")
        );
    }

    #[test]
    fn test_select_option_rejects_unknown_model() {
        let mut view = MemoryView::new(&models(), "allData_v2");

        assert!(view.select_option(ElementId::ModelSelect, "cnn_M_20x_k_4"));
        assert!(!view.select_option(ElementId::ModelSelect, "resnet"));
        assert_eq!(
            view.value(ElementId::ModelSelect).as_deref(),
            Some("cnn_M_20x_k_4")
        );
        assert_eq!(view.options(ElementId::ModelSelect).len(), 2);
    }

    #[test]
    fn test_hidden_error_keeps_text() {
        let mut view = MemoryView::new(&models(), "allData_v2");
        view.set_text(ElementId::ErrorMessage, "boom");
        view.set_visible(ElementId::ErrorMessage, true);
        assert_eq!(view.visible_error(), Some("boom"));

        view.set_visible(ElementId::ErrorMessage, false);
        assert_eq!(view.visible_error(), None);
        assert_eq!(view.text(ElementId::ErrorMessage), "boom");
    }

    #[test]
    fn test_class_toggle() {
        let mut view = MemoryView::new(&models(), "allData_v2");
        view.set_class(ElementId::UploadArea, "drag-over", true);
        assert!(view.has_class(ElementId::UploadArea, "drag-over"));

        view.set_class(ElementId::UploadArea, "drag-over", false);
        assert!(!view.has_class(ElementId::UploadArea, "drag-over"));
    }
}
