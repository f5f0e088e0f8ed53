// Path syntax: `/root/parent/item` for items, `/root/parent/item.Param` for parameters

pub const PATH_SEPARATOR: char = '/';
pub const PARAM_SEPARATOR: char = '.';

/// Split an item path into its names, e.g. `/root/a/b` -> `["root", "a", "b"]`
pub fn segments(path: &str) -> Option<Vec<&str>> {
    let rest = path.strip_prefix(PATH_SEPARATOR)?;
    let names: Vec<&str> = rest.split(PATH_SEPARATOR).collect();
    if names.iter().any(|name| name.is_empty()) {
        return None;
    }
    Some(names)
}

/// Split a parameter path into item path and parameter name
///
/// The parameter name follows the last `.` of the last segment, so item names
/// may contain dots as long as parameter names do not.
pub fn split_parameter_path(path: &str) -> Option<(&str, &str)> {
    let last_segment = path.rfind(PATH_SEPARATOR)?;
    let dot = path[last_segment..].rfind(PARAM_SEPARATOR)? + last_segment;
    let (item, param) = (&path[..dot], &path[dot + 1..]);
    if param.is_empty() || item.len() <= 1 {
        return None;
    }
    Some((item, param))
}

pub fn join_parameter_path(item_path: &str, param: &str) -> String {
    format!("{}{}{}", item_path, PARAM_SEPARATOR, param)
}
