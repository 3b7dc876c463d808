use serde::{Deserialize, Serialize};

/// Ordered column/value pairs of one tabular row.
///
/// Column order is kept as first seen so exports reproduce the input layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMap {
    entries: Vec<(String, String)>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a row by zipping a header with its values. Extra values are dropped.
    pub fn from_record<'a, H, V>(headers: H, values: V) -> Self
    where
        H: IntoIterator<Item = &'a str>,
        V: IntoIterator<Item = &'a str>,
    {
        let entries = headers
            .into_iter()
            .zip(values)
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == name)
    }

    /// Overwrites an existing column in place or appends a new one.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    /// Exchanges the values of two columns, if both are present.
    pub fn swap_values(&mut self, a: &str, b: &str) {
        let first = self.entries.iter().position(|(key, _)| key == a);
        let second = self.entries.iter().position(|(key, _)| key == b);
        if let (Some(i), Some(j)) = (first, second) {
            if i != j {
                let tmp = std::mem::take(&mut self.entries[i].1);
                self.entries[i].1 = std::mem::replace(&mut self.entries[j].1, tmp);
            }
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for FieldMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = FieldMap::new();
        for (key, value) in iter {
            map.set(&key.into(), value);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_keeps_position_of_existing_columns() {
        let mut row: FieldMap = [("a", "1"), ("b", "2")].into_iter().collect();
        row.set("a", "9");
        row.set("c", "3");
        assert_eq!(row.names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(row.get("a"), Some("9"));
    }

    #[test]
    fn swap_values_exchanges_columns() {
        let mut row: FieldMap = [("x", "10"), ("y", "20")].into_iter().collect();
        row.swap_values("x", "y");
        assert_eq!(row.get("x"), Some("20"));
        assert_eq!(row.get("y"), Some("10"));
        row.swap_values("x", "missing");
        assert_eq!(row.get("x"), Some("20"));
    }
}
