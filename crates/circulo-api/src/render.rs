use axum::response::Html;
use chrono::{DateTime, NaiveDate};
use minijinja::{Environment, UndefinedBehavior, Value};

use crate::error::AppError;

/// Templates compiled into the binary. Names ending in `.html` are auto-escaped.
const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("index.html", include_str!("../templates/index.html")),
    ("register.html", include_str!("../templates/register.html")),
    ("login.html", include_str!("../templates/login.html")),
    ("profile.html", include_str!("../templates/profile.html")),
    ("profile_edit.html", include_str!("../templates/profile_edit.html")),
    ("comment_edit.html", include_str!("../templates/comment_edit.html")),
    ("comment_delete.html", include_str!("../templates/comment_delete.html")),
    ("follow_list.html", include_str!("../templates/follow_list.html")),
];

pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        // Pages render with partial contexts (no errors, no viewer).
        env.set_undefined_behavior(UndefinedBehavior::Chainable);
        env.add_filter("datetime", format_datetime);
        env.add_filter("date", format_date);
        for (name, source) in TEMPLATES {
            env.add_template(*name, *source)?;
        }
        Ok(Self { env })
    }

    pub fn render(&self, name: &str, ctx: Value) -> Result<Html<String>, AppError> {
        let template = self.env.get_template(name)?;
        Ok(Html(template.render(ctx)?))
    }
}

fn format_datetime(value: String) -> String {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or(value)
}

fn format_date(value: String) -> String {
    NaiveDate::parse_from_str(&value, "%Y-%m-%d")
        .map(|d| d.format("%d %b %Y").to_string())
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;

    #[test]
    fn all_templates_compile() {
        let templates = Templates::new().unwrap();
        for (name, _) in TEMPLATES {
            assert!(templates.env.get_template(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn user_content_is_escaped() {
        let templates = Templates::new().unwrap();
        let Html(page) = templates
            .render(
                "login.html",
                context! { form => context! { username => "<script>x</script>" } },
            )
            .unwrap();
        assert!(page.contains("&lt;script&gt;"));
        assert!(!page.contains("<script>x"));
    }

    #[test]
    fn datetime_filter() {
        assert_eq!(
            format_datetime("2024-03-01T12:05:00.000000Z".into()),
            "2024-03-01 12:05"
        );
        assert_eq!(format_datetime("garbage".into()), "garbage");
        assert_eq!(format_date("1990-04-12".into()), "12 Apr 1990");
    }
}
