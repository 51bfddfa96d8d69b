use crate::params::Param;

const MISSING: &str = "<missing>";

/// Render a format template against entry arguments.
///
/// `{}` takes the next argument, `{N}` the N-th (zero based), `{{`/`}}` are
/// literal braces. Missing arguments render as `<missing>`; extra arguments
/// are ignored. A brace that does not start a placeholder is kept as-is.
pub fn render_template(template: &str, args: &[Param]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut next = 0;
    let mut chars = template.char_indices().peekable();

    while let Some((start, ch)) = chars.next() {
        match ch {
            '{' if chars.peek().map(|(_, c)| *c) == Some('{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek().map(|(_, c)| *c) == Some('}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let rest = &template[start + 1..];
                let Some(close) = rest.find('}') else {
                    out.push('{');
                    continue;
                };
                let spec = &rest[..close];
                let index = if spec.is_empty() {
                    let index = next;
                    next += 1;
                    Some(index)
                } else {
                    spec.trim().parse::<usize>().ok()
                };
                match index {
                    Some(index) => {
                        out.push_str(args.get(index).map_or(MISSING, Param::display));
                        // Skip the placeholder body and the closing brace.
                        for _ in 0..=spec.chars().count() {
                            chars.next();
                        }
                    }
                    None => out.push('{'),
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> Vec<Param> {
        vec![Param::new(1), Param::new("two"), Param::new(true)]
    }

    #[test]
    fn positional_and_indexed_placeholders() {
        assert_eq!(render_template("{} and {}", &args()), "1 and two");
        assert_eq!(render_template("{2}/{0}", &args()), "true/1");
        assert_eq!(render_template("{1}{}", &args()), "two1");
    }

    #[test]
    fn escapes_missing_and_stray_braces() {
        assert_eq!(render_template("{{{}}}", &args()), "{1}");
        assert_eq!(render_template("{5} {} {} {} {}", &args()), "<missing> 1 two true <missing>");
        assert_eq!(render_template("open { brace", &args()), "open { brace");
        assert_eq!(render_template("{name}", &args()), "{name}");
        assert_eq!(render_template("no placeholders", &[]), "no placeholders");
    }
}
