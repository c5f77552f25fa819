// src/utils/url.rs

//! URL manipulation utilities.

use url::Url;

/// Base used to parse relative catalog links such as `course.php?course_code=1`.
const RELATIVE_BASE: &str = "http://catalog.invalid/";

/// Read a query parameter from an absolute or relative link.
///
/// # Examples
/// ```
/// use catalog_crawler::utils::url::query_param;
///
/// assert_eq!(
///     query_param("course.php?prog=571&course_code=5710111", "course_code"),
///     Some("5710111".to_string())
/// );
/// ```
pub fn query_param(link: &str, name: &str) -> Option<String> {
    let base = Url::parse(RELATIVE_BASE).ok()?;
    let parsed = Url::options().base_url(Some(&base)).parse(link.trim()).ok()?;

    parsed
        .query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Extract the course code from a catalog course link.
pub fn extract_course_code(link: &str) -> Option<String> {
    query_param(link, "course_code")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_course_code_absolute() {
        let url = "https://catalog.metu.edu.tr/course.php?prog=571&course_code=5710111";
        assert_eq!(extract_course_code(url), Some("5710111".to_string()));
    }

    #[test]
    fn test_extract_course_code_relative() {
        assert_eq!(
            extract_course_code("/course.php?course_code=2360111"),
            Some("2360111".to_string())
        );
    }

    #[test]
    fn test_extract_course_code_missing() {
        assert_eq!(extract_course_code("course.php?prog=571"), None);
        assert_eq!(extract_course_code("course.php?course_code="), None);
        assert_eq!(extract_course_code(""), None);
    }
}
