//! Filepath: src/core/normalize.rs
//! Platform-independent path form used by every matcher.
//!
//! Only two rewrites happen: backslashes become forward slashes and a single
//! leading `./` is dropped. Case, trailing slashes and `..` segments are left
//! untouched; case folding is a matcher option, not a normalization step.

use std::borrow::Cow;

/// Canonicalize `path` for matching.
///
/// Borrows when the input is already in canonical form.
pub fn normalize(path: &str) -> Cow<'_, str>
{
    // Fast path: nothing to rewrite
    if !path.contains('\\') && !path.starts_with("./")
    {
        return Cow::Borrowed(path);
    }

    let slashed = path.replace('\\', "/");

    // Strip exactly one leading "./"
    match slashed.strip_prefix("./")
    {
        Some(rest) => Cow::Owned(rest.to_string()),
        None => Cow::Owned(slashed),
    }
}

/// Final path segment of an already-normalized path.
pub fn base_name(path: &str) -> &str
{
    path.rsplit('/')
        .next()
        .unwrap_or(path)
}

#[cfg(test)]
mod tests
{
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn backslashes_become_forward_slashes()
    {
        assert_eq!(normalize(r"src\components\Button.tsx"), "src/components/Button.tsx");
    }

    #[test]
    fn strips_single_leading_dot_slash()
    {
        assert_eq!(normalize("./src/lib.rs"), "src/lib.rs");
        assert_eq!(normalize("././src/lib.rs"), "./src/lib.rs");
        assert_eq!(normalize(r".\src\lib.rs"), "src/lib.rs");
    }

    #[test]
    fn leaves_everything_else_alone()
    {
        assert!(matches!(normalize("src/lib.rs"), Cow::Borrowed(_)));
        assert_eq!(normalize("Src/../Lib.RS/"), "Src/../Lib.RS/");
        assert_eq!(normalize(".github/workflows/ci.yml"), ".github/workflows/ci.yml");
    }

    #[test]
    fn base_name_takes_last_segment()
    {
        assert_eq!(base_name("docs/guide/intro.md"), "intro.md");
        assert_eq!(base_name("README.md"), "README.md");
    }

    proptest! {
        #[test]
        fn rewrites_separators_and_at_most_one_prefix(s in "[a-z./\\\\]{0,24}")
        {
            let slashed = s.replace('\\', "/");
            let out = normalize(&s);

            prop_assert!(!out.contains('\\'));
            let dotted = format!("./{}", out);
            prop_assert!(out == slashed || dotted == slashed);
        }

        #[test]
        fn canonical_output_is_a_fixed_point(s in "[a-z./\\\\]{0,24}")
        {
            let out = normalize(&s).into_owned();
            prop_assume!(!out.starts_with("./"));

            prop_assert!(matches!(normalize(&out), Cow::Borrowed(p) if p == out));
        }
    }
}
