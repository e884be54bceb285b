//! Body part interfaces.
//!
//! [`Part`] is the read side every body part offers. [`PartMut`] adds the
//! mutators and is only implemented by parts whose content lives locally,
//! so a server-backed view can implement [`Part`] alone.

use crate::content_type::{ContentType, ParameterList};
use crate::header::Headers;

/// Metadata accessors shared by all body parts.
pub trait Part {
    /// Full content type, `type/subtype; param=value...`.
    fn content_type(&self) -> String;

    /// Disposition type (`inline`, `attachment`, ...).
    fn disposition(&self) -> Option<&str>;

    /// Content-Transfer-Encoding.
    fn encoding(&self) -> Option<&str>;

    /// Content-ID.
    fn content_id(&self) -> Option<&str>;

    /// Content-MD5.
    fn content_md5(&self) -> Option<&str>;

    /// Content-Description.
    fn description(&self) -> Option<&str>;

    /// Content size in octets, if known.
    fn size(&self) -> Option<u32>;

    /// Content size in lines, if known.
    fn line_count(&self) -> Option<u32>;
}

/// Mutators for parts that own their content.
pub trait PartMut: Part {
    /// Replaces all fields called `name` with one field.
    fn set_header(&mut self, name: &str, value: &str);

    /// Removes all fields called `name`.
    fn remove_header(&mut self, name: &str);

    /// Replaces the content and its content type.
    fn set_content(&mut self, content: Vec<u8>, content_type: &ContentType);

    /// Sets the disposition type, dropping its parameters.
    fn set_disposition(&mut self, disposition: &str);

    /// Sets the description.
    fn set_description(&mut self, description: &str);

    /// Sets the `filename` disposition parameter.
    fn set_file_name(&mut self, file_name: &str);
}

/// A body part held in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryPart {
    headers: Headers,
    content: Vec<u8>,
}

impl MemoryPart {
    /// Creates a part from headers and content.
    #[must_use]
    pub const fn new(headers: Headers, content: Vec<u8>) -> Self {
        Self { headers, content }
    }

    /// Header fields.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Raw content.
    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.content
    }
}

impl Part for MemoryPart {
    fn content_type(&self) -> String {
        self.headers
            .get("Content-Type")
            .unwrap_or("text/plain")
            .to_string()
    }

    fn disposition(&self) -> Option<&str> {
        self.headers
            .get("Content-Disposition")
            .and_then(|value| value.split(';').next())
            .map(str::trim)
    }

    fn encoding(&self) -> Option<&str> {
        self.headers.get("Content-Transfer-Encoding")
    }

    fn content_id(&self) -> Option<&str> {
        self.headers.get("Content-ID")
    }

    fn content_md5(&self) -> Option<&str> {
        self.headers.get("Content-MD5")
    }

    fn description(&self) -> Option<&str> {
        self.headers.get("Content-Description")
    }

    fn size(&self) -> Option<u32> {
        u32::try_from(self.content.len()).ok()
    }

    fn line_count(&self) -> Option<u32> {
        None
    }
}

impl PartMut for MemoryPart {
    fn set_header(&mut self, name: &str, value: &str) {
        self.headers.set(name, value);
    }

    fn remove_header(&mut self, name: &str) {
        self.headers.remove(name);
    }

    fn set_content(&mut self, content: Vec<u8>, content_type: &ContentType) {
        self.content = content;
        self.headers.set("Content-Type", content_type.to_string());
    }

    fn set_disposition(&mut self, disposition: &str) {
        self.headers.set("Content-Disposition", disposition);
    }

    fn set_description(&mut self, description: &str) {
        self.headers.set("Content-Description", description);
    }

    fn set_file_name(&mut self, file_name: &str) {
        let kind = self.disposition().unwrap_or("attachment").to_string();
        let params: ParameterList = [("filename", file_name)].into_iter().collect();
        self.headers
            .set("Content-Disposition", format!("{kind}{params}"));
    }
}
