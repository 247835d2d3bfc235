//! Expression parser and evaluator.

use std::fmt;
use std::sync::OnceLock;

use regex_lite::Regex;

use crate::error::{PropsError, PropsResult};
use crate::properties::{Properties, PropertyValue};

/// One piece of a parsed expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text (escapes already resolved).
    Literal(String),
    /// `${NAME}`
    Property(String),
    /// `${NAME[]}`
    ListProperty(String),
}

/// A parsed, validated value that may reference build properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    source: String,
    segments: Vec<Segment>,
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").expect("property name pattern is valid")
    })
}

impl Expr {
    /// Parse `source`, validating every reference.
    pub fn parse(source: &str) -> PropsResult<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut list_refs = 0usize;
        let mut rest = source;

        while let Some(pos) = rest.find('$') {
            literal.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];

            if let Some(tail) = after.strip_prefix('$') {
                literal.push('$');
                rest = tail;
                continue;
            }

            let Some(body) = after.strip_prefix('{') else {
                // A lone '$' is ordinary text.
                literal.push('$');
                rest = after;
                continue;
            };

            let end = body
                .find('}')
                .ok_or_else(|| PropsError::Unterminated(source.to_string()))?;
            let reference = &body[..end];
            rest = &body[end + 1..];

            let (name, is_list) = match reference.strip_suffix("[]") {
                Some(name) => (name, true),
                None => (reference, false),
            };
            if !name_pattern().is_match(name) {
                return Err(PropsError::InvalidName {
                    expr: source.to_string(),
                    name: name.to_string(),
                });
            }

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            if is_list {
                list_refs += 1;
                segments.push(Segment::ListProperty(name.to_string()));
            } else {
                segments.push(Segment::Property(name.to_string()));
            }
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        if list_refs > 1 {
            return Err(PropsError::MultipleListReferences(source.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// The original text this expression was parsed from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether this expression contains a `${NAME[]}` reference.
    pub fn is_list(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::ListProperty(_)))
    }

    /// Expand to exactly one string.
    pub fn expand(&self, props: &Properties) -> PropsResult<String> {
        expand_segments(&self.segments, props)
    }

    /// Expand in list mode.
    ///
    /// Without a list reference this yields the single scalar expansion.
    /// With one, the text before and after the reference is applied to every
    /// item, so `-l${LIBS[]}` with `LIBS = [a, b]` yields `["-la", "-lb"]`.
    pub fn expand_list(&self, props: &Properties) -> PropsResult<Vec<String>> {
        let Some(idx) = self
            .segments
            .iter()
            .position(|s| matches!(s, Segment::ListProperty(_)))
        else {
            return Ok(vec![self.expand(props)?]);
        };

        let Segment::ListProperty(name) = &self.segments[idx] else {
            unreachable!("position matched a list reference");
        };
        let items = props
            .get(name)
            .ok_or_else(|| PropsError::UnknownProperty(name.clone()))?
            .items();
        let prefix = expand_segments(&self.segments[..idx], props)?;
        let suffix = expand_segments(&self.segments[idx + 1..], props)?;

        Ok(items
            .into_iter()
            .map(|item| format!("{prefix}{item}{suffix}"))
            .collect())
    }

    /// Expand in list mode and split every result on whitespace.
    ///
    /// This is the form used for compiler and linker flags, where one value
    /// such as `"-O2 -g"` stands for several arguments.
    pub fn tokens(&self, props: &Properties) -> PropsResult<Vec<String>> {
        Ok(self
            .expand_list(props)?
            .iter()
            .flat_map(|s| s.split_whitespace())
            .map(str::to_string)
            .collect())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for Expr {
    type Err = PropsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn expand_segments(segments: &[Segment], props: &Properties) -> PropsResult<String> {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Property(name) => match props.get(name) {
                Some(PropertyValue::Scalar(value)) => out.push_str(value),
                Some(PropertyValue::List(_)) => {
                    return Err(PropsError::ListInScalarContext(name.clone()))
                }
                None => return Err(PropsError::UnknownProperty(name.clone())),
            },
            Segment::ListProperty(name) => {
                return Err(PropsError::ListInScalarContext(name.clone()))
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props() -> Properties {
        let mut p = Properties::new();
        p.set("OUTPUT_DIR", "/tmp/out");
        p.set("OPT", "-O2 -g");
        p.set_list("LIBS", ["ssl", "crypto"]);
        p.set("CSV", "pthread, dl");
        p
    }

    #[test]
    fn test_parse_literal_only() {
        let expr = Expr::parse("-Wall").unwrap();
        assert_eq!(expr.segments(), &[Segment::Literal("-Wall".to_string())]);
        assert!(!expr.is_list());
    }

    #[test]
    fn test_parse_mixed_segments() {
        let expr = Expr::parse("${OUTPUT_DIR}/obj/${NAME}.o").unwrap();
        assert_eq!(
            expr.segments(),
            &[
                Segment::Property("OUTPUT_DIR".to_string()),
                Segment::Literal("/obj/".to_string()),
                Segment::Property("NAME".to_string()),
                Segment::Literal(".o".to_string()),
            ]
        );
    }

    #[test]
    fn test_escaped_dollar() {
        let expr = Expr::parse("cost$$5 and $HOME").unwrap();
        assert_eq!(expr.expand(&Properties::new()).unwrap(), "cost$5 and $HOME");
    }

    #[test]
    fn test_unterminated_reference() {
        assert!(matches!(
            Expr::parse("${OUTPUT_DIR"),
            Err(PropsError::Unterminated(_))
        ));
    }

    #[test]
    fn test_invalid_name_rejected() {
        assert!(matches!(
            Expr::parse("${bad name}"),
            Err(PropsError::InvalidName { .. })
        ));
        assert!(matches!(
            Expr::parse("${}"),
            Err(PropsError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_two_list_references_rejected() {
        assert!(matches!(
            Expr::parse("${A[]}${B[]}"),
            Err(PropsError::MultipleListReferences(_))
        ));
    }

    #[test]
    fn test_scalar_expand() {
        let expr = Expr::parse("${OUTPUT_DIR}/a.o").unwrap();
        assert_eq!(expr.expand(&props()).unwrap(), "/tmp/out/a.o");
    }

    #[test]
    fn test_scalar_expand_rejects_list() {
        let expr = Expr::parse("${LIBS}").unwrap();
        assert_eq!(
            expr.expand(&props()),
            Err(PropsError::ListInScalarContext("LIBS".to_string()))
        );
    }

    #[test]
    fn test_unknown_property() {
        let expr = Expr::parse("${NOPE}").unwrap();
        assert_eq!(
            expr.expand(&props()),
            Err(PropsError::UnknownProperty("NOPE".to_string()))
        );
    }

    #[test]
    fn test_list_expand_applies_affixes() {
        let expr = Expr::parse("-l${LIBS[]}.x").unwrap();
        assert_eq!(expr.expand_list(&props()).unwrap(), vec!["-lssl.x", "-lcrypto.x"]);
    }

    #[test]
    fn test_list_expand_of_scalar_splits_commas() {
        let expr = Expr::parse("${CSV[]}").unwrap();
        assert_eq!(expr.expand_list(&props()).unwrap(), vec!["pthread", "dl"]);
    }

    #[test]
    fn test_list_expand_without_list_reference() {
        let expr = Expr::parse("${OUTPUT_DIR}").unwrap();
        assert_eq!(expr.expand_list(&props()).unwrap(), vec!["/tmp/out"]);
    }

    #[test]
    fn test_tokens_split_whitespace() {
        let expr = Expr::parse("${OPT} -DNDEBUG").unwrap();
        assert_eq!(expr.tokens(&props()).unwrap(), vec!["-O2", "-g", "-DNDEBUG"]);
    }

    #[test]
    fn test_display_roundtrips_source() {
        let expr: Expr = "${OPT}".parse().unwrap();
        assert_eq!(expr.to_string(), "${OPT}");
    }
}
