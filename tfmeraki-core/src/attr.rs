//! Attr - Three-state scalar attribute (unknown / null / known)

/// Typed attribute value as Terraform sees it
///
/// `Unknown` is only valid in a plan. `Null` means the attribute was not set,
/// or the API did not return it.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Attr<T> {
    Unknown,
    #[default]
    Null,
    Known(T),
}

impl<T> Attr<T> {
    pub fn is_known(&self) -> bool {
        matches!(self, Attr::Known(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Attr::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Attr::Unknown)
    }

    pub fn known(&self) -> Option<&T> {
        match self {
            Attr::Known(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_known(self) -> Option<T> {
        match self {
            Attr::Known(v) => Some(v),
            _ => None,
        }
    }

    /// `None` becomes `Null`
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => Attr::Known(v),
            None => Attr::Null,
        }
    }
}

impl Attr<String> {
    pub fn as_str(&self) -> Option<&str> {
        self.known().map(String::as_str)
    }
}

impl<T> From<T> for Attr<T> {
    fn from(value: T) -> Self {
        Attr::Known(value)
    }
}

impl From<&str> for Attr<String> {
    fn from(value: &str) -> Self {
        Attr::Known(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_null() {
        let attr: Attr<String> = Attr::default();
        assert!(attr.is_null());
        assert!(!attr.is_known());
    }

    #[test]
    fn known_accessors() {
        let attr: Attr<String> = Attr::from("guest");
        assert_eq!(attr.as_str(), Some("guest"));
        assert_eq!(attr.into_known(), Some("guest".to_string()));

        let unknown: Attr<i64> = Attr::Unknown;
        assert!(unknown.is_unknown());
        assert_eq!(unknown.known(), None);
    }

    #[test]
    fn from_option() {
        assert_eq!(Attr::from_option(Some(3)), Attr::Known(3));
        assert_eq!(Attr::<i64>::from_option(None), Attr::Null);
    }
}
