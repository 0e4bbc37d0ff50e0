use serde::Serialize;

use crate::data::model::Column;

/// Turn a column name into a display label: `avg_days_trending` → `Avg. Days Trending`.
pub fn column_label(name: &str) -> String {
    let spaced = name.replace('_', " ").replace("avg", "avg.");
    title_case(&spaced)
}

/// Capitalize the first letter of every run of letters, lowercase the rest.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_is_letter = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if prev_is_letter {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(ch);
            prev_is_letter = false;
        }
    }
    out
}

/// A selectable variable for axis, colour or size pickers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnOption {
    pub label: String,
    pub value: &'static str,
}

/// Every numeric column of a table schema with its display label.
pub fn column_options<C: Column>() -> Vec<ColumnOption> {
    C::numeric()
        .into_iter()
        .map(|c| ColumnOption {
            label: column_label(c.name()),
            value: c.name(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::aggregate::ChannelColumn;

    #[test]
    fn labels() {
        assert_eq!(column_label("avg_days_trending"), "Avg. Days Trending");
        assert_eq!(column_label("times_in_trending"), "Times In Trending");
        assert_eq!(column_label("comment_count"), "Comment Count");
        assert_eq!(column_label(""), "");
    }

    #[test]
    fn channel_options_skip_text_columns() {
        let options = column_options::<ChannelColumn>();
        assert_eq!(options.len(), 10);
        assert_eq!(options[0].value, "subscribers");
        assert_eq!(options[2].label, "Avg. Views");
    }
}
