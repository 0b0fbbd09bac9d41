use pictura_core::SupportedRatio;

/// Longest slug produced from a prompt
pub const DEFAULT_SLUG_LENGTH: usize = 50;

const UNTITLED: &str = "untitled";

/// Kebab-case directory name derived from a prompt
///
/// Keeps only ASCII letters, digits and hyphens, and falls back to
/// `untitled` when nothing survives.
pub fn generate_slug(prompt: &str, max_len: usize) -> String {
    let mut slug = String::with_capacity(prompt.len().min(max_len));
    let mut pending_hyphen = false;

    for c in prompt.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else if c == '-' || c.is_whitespace() {
            pending_hyphen = true;
        }
    }

    slug.truncate(max_len);
    let slug = slug.trim_end_matches('-');

    if slug.is_empty() {
        UNTITLED.to_owned()
    } else {
        slug.to_owned()
    }
}

/// Local time formatted as `YYYY-MM-DD-HHmmss`
pub fn generate_timestamp() -> String {
    jiff::Zoned::now().strftime("%Y-%m-%d-%H%M%S").to_string()
}

/// File stem for a ratio, `16:9` becomes `16x9`
pub fn ratio_to_filename(ratio: SupportedRatio) -> String {
    ratio.as_str().replace(':', "x")
}

/// Ratio encoded in an image file name such as `16x9.png`
pub fn filename_to_ratio(filename: &str) -> Option<SupportedRatio> {
    let stem = filename.strip_suffix(".png").unwrap_or(filename);
    stem.replacen('x', ":", 1).parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_is_kebab_case() {
        assert_eq!(generate_slug("A Cozy Cabin, in the Woods!", 50), "a-cozy-cabin-in-the-woods");
        assert_eq!(generate_slug("  multiple   spaces -- and---dashes ", 50), "multiple-spaces-and-dashes");
    }

    #[test]
    fn slug_drops_non_ascii() {
        assert_eq!(generate_slug("café über 2024", 50), "caf-ber-2024");
    }

    #[test]
    fn slug_truncates_without_trailing_hyphen() {
        let slug = generate_slug("abcde fghij", 6);
        assert_eq!(slug, "abcde");

        let long = "word ".repeat(40);
        assert!(generate_slug(&long, DEFAULT_SLUG_LENGTH).len() <= DEFAULT_SLUG_LENGTH);
    }

    #[test]
    fn empty_slug_is_untitled() {
        assert_eq!(generate_slug("", 50), "untitled");
        assert_eq!(generate_slug("   ", 50), "untitled");
        assert_eq!(generate_slug("!!!", 50), "untitled");
    }

    #[test]
    fn timestamp_shape() {
        let timestamp = generate_timestamp();
        assert_eq!(timestamp.len(), 17);
        assert_eq!(&timestamp[4..5], "-");
        assert_eq!(&timestamp[10..11], "-");
        assert!(timestamp[11..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn ratio_file_names() {
        assert_eq!(ratio_to_filename(SupportedRatio::Landscape16x9), "16x9");
        assert_eq!(filename_to_ratio("16x9.png"), Some(SupportedRatio::Landscape16x9));
        assert_eq!(filename_to_ratio("21x9"), Some(SupportedRatio::Ultrawide21x9));
        assert_eq!(filename_to_ratio("thumbnail.png"), None);
    }
}
