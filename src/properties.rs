/// One custom property. Values are kept as the document wrote them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// Property name.
    pub name: String,
    /// Value as written in the document.
    pub value: String,
}

/// Ordered name/value pairs attached to a map, layer, tileset, tile or object.
///
/// Typed getters parse on access; nothing is validated at load time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties(Vec<Property>);

impl Properties {
    /// No properties.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a property, replacing an earlier one with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|p| p.name == name) {
            Some(p) => p.value = value,
            None => self.0.push(Property { name, value }),
        }
    }

    /// Raw text of property `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }

    /// Same as [`get`](Properties::get).
    pub fn get_string(&self, name: &str) -> Option<&str> {
        self.get(name)
    }

    /// `true`/`false` (or `1`/`0`) value of `name`.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }

    /// Integer value of `name`.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name)?.trim().parse().ok()
    }

    /// Integer value of `name`, if it fits an `i32`.
    pub fn get_i32(&self, name: &str) -> Option<i32> {
        self.get(name)?.trim().parse().ok()
    }

    /// Float value of `name`.
    pub fn get_f32(&self, name: &str) -> Option<f32> {
        self.get(name)?.trim().parse().ok()
    }

    /// Properties in document order.
    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.0.iter()
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no properties.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for Properties {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut out = Properties::new();
        for (name, value) in iter {
            out.insert(name, value);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_getters_parse_on_access() {
        let props: Properties = [
            ("is_night", "true"),
            ("gravity", "9.8"),
            ("big_id", "5000000000"),
            ("theme", "forest"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();

        assert_eq!(props.get_bool("is_night"), Some(true));
        assert_eq!(props.get_f32("gravity"), Some(9.8));
        assert_eq!(props.get_i64("big_id"), Some(5_000_000_000));
        assert_eq!(props.get_i32("big_id"), None);
        assert_eq!(props.get_string("theme"), Some("forest"));
        assert_eq!(props.get_bool("theme"), None);
        assert_eq!(props.get("missing"), None);
    }

    #[test]
    fn later_duplicate_wins_and_keeps_position() {
        let mut props = Properties::new();
        props.insert("a", "1");
        props.insert("b", "2");
        props.insert("a", "3");
        let names: Vec<_> = props.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(props.get("a"), Some("3"));
        assert_eq!(props.len(), 2);
    }
}
