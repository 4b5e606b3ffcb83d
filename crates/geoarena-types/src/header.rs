use std::collections::BTreeMap;

use crate::location::Bounds;

/// Stream metadata delivered once per input, before any entity buffer.
///
/// Holds the bounding boxes announced by the input, whether the input
/// may carry several versions of the same object (history and change
/// files), and free-form key/value attributes such as `generator` or
/// `version`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamHeader {
    boxes: Vec<Bounds>,
    multiple_object_versions: bool,
    attributes: BTreeMap<String, String>,
}

impl StreamHeader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn boxes(&self) -> &[Bounds] {
        &self.boxes
    }

    pub fn add_box(&mut self, bounds: Bounds) -> &mut Self {
        self.boxes.push(bounds);
        self
    }

    /// Union of all announced boxes; undefined if there are none.
    #[must_use]
    pub fn joined_boxes(&self) -> Bounds {
        let mut joined = Bounds::default();
        for b in &self.boxes {
            joined.extend_bounds(b);
        }
        joined
    }

    #[must_use]
    pub fn has_multiple_object_versions(&self) -> bool {
        self.multiple_object_versions
    }

    pub fn set_multiple_object_versions(&mut self, value: bool) -> &mut Self {
        self.multiple_object_versions = value;
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Set an attribute, replacing any previous value for `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn generator(&self) -> Option<&str> {
        self.get("generator")
    }

    pub fn set_generator(&mut self, generator: impl Into<String>) -> &mut Self {
        self.set("generator", generator)
    }

    /// Attributes in key order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Location;

    #[test]
    fn attributes_last_write_wins() {
        let mut header = StreamHeader::new();
        header.set("version", "0.6").set_generator("first");
        header.set_generator("second");
        assert_eq!(header.generator(), Some("second"));
        assert_eq!(header.get("version"), Some("0.6"));
        assert_eq!(header.get("missing"), None);

        let keys: Vec<_> = header.attributes().map(|(k, _)| k).collect();
        assert_eq!(keys, ["generator", "version"]);
    }

    #[test]
    fn joined_boxes_covers_all() {
        let mut header = StreamHeader::new();
        assert!(!header.joined_boxes().is_defined());
        header
            .add_box(Bounds::new(Location::new_raw(0, 0), Location::new_raw(10, 10)))
            .add_box(Bounds::new(Location::new_raw(-10, 5), Location::new_raw(0, 20)));
        let joined = header.joined_boxes();
        assert_eq!(joined.bottom_left(), Location::new_raw(-10, 0));
        assert_eq!(joined.top_right(), Location::new_raw(10, 20));
    }

    #[test]
    fn multiple_versions_flag() {
        let mut header = StreamHeader::new();
        assert!(!header.has_multiple_object_versions());
        header.set_multiple_object_versions(true);
        assert!(header.has_multiple_object_versions());
    }
}
