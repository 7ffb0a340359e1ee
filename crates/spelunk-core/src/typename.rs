//! Type-name cleaning for readable dumps.
//!
//! Debug info spells container types with every default template argument
//! expanded; `std::map<int, double>` arrives as a line-filling monster. The
//! cleaner keeps only the outermost container's significant arguments
//! (data-driven per container) and strips nested templates' own argument
//! lists entirely.

/// Significant template argument count per recognized container; anything
/// else keeps three.
static SIGNIFICANT_ARGS: &[(&str, usize)] = &[
    ("std::vector", 1),
    ("std::map", 2),
    ("std::set", 1),
    ("std::unordered_map", 2),
    ("std::unordered_set", 1),
    ("std::__cxx11::list", 1),
    ("std::list", 1),
    ("std::deque", 1),
    ("std::unique_ptr", 1),
    ("std::shared_ptr", 1),
    ("frame::lf::HashMap", 2),
    ("frame::lf::Vector", 1),
];

const DEFAULT_ARGS: usize = 3;

fn significant_args(prefix: &str) -> usize
{
    SIGNIFICANT_ARGS
        .iter()
        .find(|(name, _)| *name == prefix)
        .map(|(_, n)| *n)
        .unwrap_or(DEFAULT_ARGS)
}

/// Drop a type's own template argument list: `pair<int, long>` → `pair`.
fn remove_template_params(s: &str) -> String
{
    match s.find('<') {
        None => s.to_string(),
        Some(open) => {
            let close = s.rfind('>').map(|i| i + 1).unwrap_or(s.len());
            format!("{}{}", &s[..open], &s[close..])
        }
    }
}

/// Keep the first `keep` top-level arguments, each with its own template
/// arguments removed.
fn clean_template_arguments(args: &str, mut keep: usize) -> String
{
    let mut level = 0usize;
    let mut out = String::new();
    let mut last = 0usize;
    for (i, c) in args.bytes().enumerate() {
        match c {
            b'<' => level += 1,
            b'>' => level = level.saturating_sub(1),
            b',' if level == 0 => {
                if keep == 0 {
                    return out;
                }
                keep -= 1;
                if last != 0 {
                    out.push_str(", ");
                }
                out.push_str(&remove_template_params(args[last..i].trim()));
                last = i + 2;
            }
            _ => {}
        }
    }
    if keep > 0 {
        if last != 0 {
            out.push_str(", ");
        }
        out.push_str(&remove_template_params(args.get(last..).unwrap_or("").trim()));
    }
    out
}

/// Recursively prune a qualified type name's template arguments down to the
/// readable core. Only the trailing argument list is expanded; templates in
/// the middle of the name (`vector<int>::iterator`) are dropped whole.
pub fn clean_type_name(name: &str) -> String
{
    if name.is_empty() {
        return String::new();
    }
    let mut level = 0usize;
    let mut out = String::new();
    let mut last = 0usize;
    for (i, c) in name.bytes().enumerate() {
        match c {
            b'<' => {
                if level == 0 {
                    out.push_str(&name[last..i]);
                    last = i;
                }
                level += 1;
            }
            b'>' => {
                level = level.saturating_sub(1);
                if level == 0 {
                    if i + 1 >= name.len() {
                        let keep = significant_args(&name[..last]);
                        out.push('<');
                        out.push_str(&clean_template_arguments(&name[last + 1..i], keep));
                        out.push('>');
                    }
                    last = i + 1;
                }
            }
            _ => {}
        }
    }
    out.push_str(name.get(last..).unwrap_or(""));
    out
}
