//! Namespaced attribute dictionary

use std::collections::BTreeMap;

use crate::numeric::parse_int_lenient;

/// Prefix every header attribute key carries
pub const ATTRIBUTE_PREFIX: &str = "SlicerAstro.";

/// Attribute key to string value, iterated in key order
pub type AttributeMap = BTreeMap<String, String>;

/// `"NAXIS1"` -> `"SlicerAstro.NAXIS1"`
pub fn attribute_key(keyword: &str) -> String {
    format!("{ATTRIBUTE_PREFIX}{keyword}")
}

/// Header keyword of an attribute key, `None` if it lacks the prefix
pub fn header_keyword(key: &str) -> Option<&str> {
    key.strip_prefix(ATTRIBUTE_PREFIX)
}

/// Axis extents declared by the `NAXISn` attributes for `naxes` axes.
///
/// Missing or negative extents count as 0.
pub fn declared_dimensions(attributes: &AttributeMap, naxes: usize) -> Vec<usize> {
    (1..=naxes)
        .map(|axis| {
            attributes
                .get(&attribute_key(&format!("NAXIS{axis}")))
                .map(|value| usize::try_from(parse_int_lenient(value)).unwrap_or(0))
                .unwrap_or(0)
        })
        .collect()
}

/// Number of elements the `NAXISn` attributes describe
pub fn declared_element_count(attributes: &AttributeMap, naxes: usize) -> usize {
    declared_dimensions(attributes, naxes).iter().product()
}

/// Attributes describing an image of `bitpix` with the given extents,
/// NAXIS1 first
pub fn image_attributes(bitpix: i64, dims: &[usize]) -> AttributeMap {
    let mut attributes = AttributeMap::new();
    attributes.insert(attribute_key("SIMPLE"), "T".to_string());
    attributes.insert(attribute_key("BITPIX"), bitpix.to_string());
    attributes.insert(attribute_key("NAXIS"), dims.len().to_string());
    for (i, extent) in dims.iter().enumerate() {
        attributes.insert(attribute_key(&format!("NAXIS{}", i + 1)), extent.to_string());
    }
    attributes
}
