/// Normalize text by replacing control characters with spaces and collapsing whitespace
/// Used on header cells so that `"First\nName "` and `"First Name"` are the same column
pub fn normalize_string(value: &str) -> String {
    return value
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ");
}

/// Lowercase the step name, upper-case the first letter of each word and drop the spaces
///
/// `"flatfile validate"` becomes `"FlatfileValidate"`.
pub fn to_camel_case(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut upper_next = true;
    for c in value.to_lowercase().chars() {
        if c.is_whitespace() {
            upper_next = true;
            continue;
        }
        if upper_next {
            result.extend(c.to_uppercase());
            upper_next = false;
        } else {
            result.push(c);
        }
    }
    return result;
}

/// Case-insensitive key lookup in an ordered row map.
pub fn find_case_insensitive<'a, V>(
    entries: impl IntoIterator<Item = (&'a String, &'a V)>,
    key: &str,
) -> Option<&'a V>
where
    V: 'a,
{
    let wanted = key.to_lowercase();
    entries
        .into_iter()
        .find(|(name, _)| name.to_lowercase() == wanted)
        .map(|(_, value)| value)
}
