use serde::{Deserialize, Serialize};
use std::fmt;

/// Группа раскладки XKB (индекс в списке настроенных раскладок сессии)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LayoutGroup(pub u8);

impl LayoutGroup {
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Значение свойства окна: ровно одно 32-битное число
    pub fn to_property_value(self) -> u32 {
        u32::from(self.0)
    }

    /// Разбор значения свойства. `None`, если это не ровно одно число
    /// или число не помещается в диапазон групп.
    pub fn from_property_values(values: &[u32]) -> Option<Self> {
        match values {
            [single] => u8::try_from(*single).ok().map(Self),
            _ => None,
        }
    }
}

impl fmt::Display for LayoutGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group {}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_single_value() {
        let value = LayoutGroup(2).to_property_value();
        assert_eq!(LayoutGroup::from_property_values(&[value]), Some(LayoutGroup(2)));
    }

    #[test]
    fn test_malformed_property_values() {
        // пусто, два числа, число вне диапазона групп
        assert_eq!(LayoutGroup::from_property_values(&[]), None);
        assert_eq!(LayoutGroup::from_property_values(&[0, 0]), None);
        assert_eq!(LayoutGroup::from_property_values(&[300]), None);
    }
}
