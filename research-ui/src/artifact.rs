//! Finished slide deck: preview source and file export.

use chrono::NaiveDate;
use wasm_bindgen::JsCast;

use crate::session::{JobSession, JobState};

pub const SLIDES_MIME: &str = "text/html";
const FILE_PREFIX: &str = "research_slides_";
const FILE_EXTENSION: &str = "html";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideArtifact {
    html: String,
}

impl SlideArtifact {
    /// Available only once the session has completed with a payload
    pub fn from_session(session: &JobSession) -> Option<Self> {
        if session.state != JobState::Completed {
            return None;
        }
        session.result_payload.clone().map(|html| Self { html })
    }

    /// Document for an isolated `<iframe srcdoc>` preview
    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn file_name(date: NaiveDate) -> String {
        format!("{FILE_PREFIX}{}.{FILE_EXTENSION}", date.format("%Y-%m-%d"))
    }

    /// Saves the deck through a temporary object URL, named for today's UTC date.
    pub fn download(&self) -> Result<(), String> {
        let file_name = Self::file_name(chrono::Utc::now().date_naive());
        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;
        let body = document.body().ok_or("no body")?;

        let parts = js_sys::Array::of1(&wasm_bindgen::JsValue::from_str(&self.html));
        let options = web_sys::BlobPropertyBag::new();
        options.set_type(SLIDES_MIME);
        let blob = web_sys::Blob::new_with_str_sequence_and_options(&parts, &options)
            .map_err(|e| format!("Failed to create blob: {e:?}"))?;
        let url = web_sys::Url::create_object_url_with_blob(&blob)
            .map_err(|e| format!("Failed to create object URL: {e:?}"))?;

        let anchor = document
            .create_element("a")
            .map_err(|e| format!("Failed to create anchor: {e:?}"))?
            .dyn_into::<web_sys::HtmlAnchorElement>()
            .map_err(|_| "anchor element has unexpected type".to_string())?;
        anchor.set_href(&url);
        anchor.set_download(&file_name);

        let appended = body.append_child(&anchor);
        if appended.is_ok() {
            anchor.click();
            let _ = body.remove_child(&anchor);
        }
        let _ = web_sys::Url::revoke_object_url(&url);
        appended
            .map(|_| ())
            .map_err(|e| format!("Failed to attach anchor: {e:?}"))
    }
}
