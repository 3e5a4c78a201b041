//! URL slugs for posts and practice areas

/// Generate a URL-safe slug from a title.
///
/// Lowercases, folds common Latin accents to ASCII, keeps ASCII alphanumerics
/// and collapses every other run of characters into a single `-`.
pub fn generate_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_separator = false;

    for c in title.chars().flat_map(char::to_lowercase) {
        let c = fold_accent(c);
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c);
        } else {
            pending_separator = true;
        }
    }

    slug
}

/// `base`, then `base-2`, `base-3`, ... for the nth collision
pub fn numbered_slug(base: &str, attempt: u32) -> String {
    if attempt <= 1 {
        base.to_string()
    } else {
        format!("{}-{}", base, attempt)
    }
}

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_generate_slug() {
        assert_eq!(generate_slug("Hello World"), "hello-world");
        assert_eq!(generate_slug("  Labor Law: 5 Tips!  "), "labor-law-5-tips");
        assert_eq!(generate_slug("a---b___c"), "a-b-c");
        assert_eq!(generate_slug("Direito Tributário"), "direito-tributario");
        assert_eq!(generate_slug("Ação & Reação"), "acao-reacao");
        assert_eq!(generate_slug("!!!"), "");
    }

    #[test]
    fn test_numbered_slug() {
        assert_eq!(numbered_slug("post", 1), "post");
        assert_eq!(numbered_slug("post", 2), "post-2");
        assert_eq!(numbered_slug("post", 3), "post-3");
    }

    proptest! {
        #[test]
        fn slug_is_canonical(title in "\\PC{0,60}") {
            let slug = generate_slug(&title);
            prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
            prop_assert!(!slug.starts_with('-') && !slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
            prop_assert_eq!(generate_slug(&slug), slug.clone());
        }
    }
}
