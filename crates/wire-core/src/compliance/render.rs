//! Reminder and report rendering

use super::{ComplianceResults, ItemErrors};
use crate::error::{Result, WireError};
use crate::outbox::MailMessage;
use handlebars::Handlebars;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Report text when a pass found nothing
pub const NO_ERRORS: &str = "no errors found";

const REMINDER: &str = "reminder";

const REMINDER_TEMPLATE: &str = r#"<html>
<head>
    <meta charset="utf-8">
</head>
<body style="font-family: Calibri,sans-serif; font-size: 11pt;">
    <p>Hi {{assignee}},</p>
    <p>This is an automated email concerning the work items below, in which the following errors were detected. Please address them to prevent further notifications.</p>
{{#each items}}
    {{#if url}}<h3><a href="{{url}}" target="_blank">{{heading}}</a></h3>{{else}}<h3>{{heading}}</h3>{{/if}}
    <table border="1" cellpadding="6" cellspacing="0" style="border-collapse: collapse;">
        <thead>
            <tr><th>Error Type</th><th>Field Name</th><th>Description</th><th>Requirements</th></tr>
        </thead>
        <tbody>
{{#each failures}}
            <tr><td>{{kind}}</td><td>{{field_name}}</td><td>{{description}}</td><td>{{requirements}}</td></tr>
{{/each}}
        </tbody>
    </table>
{{/each}}
    <p>Thanks!</p>
</body>
</html>
"#;

/// Subject line for an assignee's reminder
pub fn subject(items: &BTreeMap<i64, ItemErrors>) -> String {
    match items.values().next() {
        Some(only) if items.len() == 1 => only.heading(),
        _ => format!("{} Work Items need attention", items.len()),
    }
}

/// Compiled HTML reminder template
pub struct ReminderTemplate {
    handlebars: Handlebars<'static>,
}

impl ReminderTemplate {
    /// Compile the reminder template in strict mode
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars
            .register_template_string(REMINDER, REMINDER_TEMPLATE)
            .map_err(|e| WireError::template(format!("reminder template: {}", e)))?;
        Ok(Self { handlebars })
    }

    /// HTML reminder for one assignee, one section per work item
    pub fn notification(
        &self,
        assignee: &str,
        address: &str,
        items: &BTreeMap<i64, ItemErrors>,
    ) -> Result<MailMessage> {
        let context = json!({
            "assignee": assignee,
            "items": items.values().map(item_context).collect::<Vec<_>>(),
        });

        let body = self
            .handlebars
            .render(REMINDER, &context)
            .map_err(|e| WireError::template(format!("reminder for {}: {}", assignee, e)))?;

        Ok(MailMessage::html(assignee, address, subject(items), body))
    }
}

fn item_context(errors: &ItemErrors) -> Value {
    json!({
        "heading": errors.heading(),
        "url": errors.url,
        "failures": errors
            .failures
            .iter()
            .map(|failure| json!({
                "kind": failure.kind.to_string(),
                "field_name": failure.rule.field_name(),
                "description": failure.rule.description(),
                "requirements": failure.rule.help_message(),
            }))
            .collect::<Vec<_>>(),
    })
}

/// Plain-text administrator report covering every assignee
pub fn report(results: &ComplianceResults) -> String {
    if results.is_empty() {
        return NO_ERRORS.to_string();
    }

    let mut text = String::new();
    for (assignee, errors) in results.iter() {
        text.push_str(&format!("Composing reminder for {}.\n", assignee));
        text.push_str(&format!("Item: {}\n", errors.heading()));
        text.push_str("Fields: \n");
        for failure in &errors.failures {
            text.push_str(&format!(
                "    {} - {}: {}\n",
                failure.kind,
                failure.rule.lookup_key(),
                failure.rule.description()
            ));
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::WorkItem;
    use crate::compliance::ComplianceEvaluator;
    use crate::config::FieldRule;
    use serde_json::json;

    fn results() -> (ComplianceEvaluator, ComplianceResults) {
        let rules = vec![FieldRule::new("Priority", "^[1-4]$")
            .unwrap()
            .with_prefix("Custom.")
            .with_description("Priority <1-4>")
            .with_help_message("Use 1 for outages")];
        let recipients = BTreeMap::from([("Alice".to_string(), "alice@contoso.com".to_string())]);
        let evaluator = ComplianceEvaluator::new(rules, recipients);
        let items = vec![
            WorkItem::new(42, "Alice", "Disk <full>")
                .with_url("https://contoso/wi/42")
                .with_field("Custom.Priority", json!("7")),
        ];
        let results = evaluator.evaluate(&items);
        (evaluator, results)
    }

    #[test]
    fn test_notification_body() {
        let (evaluator, results) = results();
        let messages = evaluator.notifications(&results).unwrap();
        let body = &messages[0].body;

        assert_eq!(messages[0].subject, "Work Item 42 - Disk <full>");
        assert!(body.contains("Work Item 42 - Disk &lt;full&gt;"));
        assert!(body.contains("<td>BAD VALUE</td>"));
        assert!(body.contains("Priority &lt;1-4&gt;"));
        assert!(body.contains("href=\"https://contoso/wi/42\""));
    }

    #[test]
    fn test_notification_escapes_markup() {
        let template = ReminderTemplate::new().unwrap();
        let mut items = BTreeMap::new();
        items.insert(
            7,
            ItemErrors {
                assignee: "Mallory <m>".into(),
                work_item_id: 7,
                title: "<script>alert(1)</script>".into(),
                url: String::new(),
                failures: Vec::new(),
            },
        );

        let message = template.notification("Mallory <m>", "m@contoso.com", &items).unwrap();
        assert!(!message.body.contains("<script>"));
        assert!(message.body.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(message.body.contains("Hi Mallory &lt;m&gt;,"));
        assert!(message.body.contains("<h3>Work Item 7 - "));
        assert!(!message.body.contains("href="));
    }

    #[test]
    fn test_notification_lists_every_item() {
        let (_, results) = results();
        let template = ReminderTemplate::new().unwrap();
        let items = results.items_for("Alice").unwrap();
        let message = template.notification("Alice", "alice@contoso.com", items).unwrap();

        assert!(message.is_html);
        assert_eq!(message.body.matches("<tr><td>").count(), 1);
        assert!(message.body.contains("<td>Use 1 for outages</td>"));
    }

    #[test]
    fn test_report_lines() {
        let (_, results) = results();
        let text = report(&results);
        assert!(text.starts_with("Composing reminder for Alice.\nItem: Work Item 42 - Disk <full>\n"));
        assert!(text.contains("    BAD VALUE - Custom.Priority: Priority <1-4>"));
    }

    #[test]
    fn test_empty_report() {
        assert_eq!(report(&ComplianceResults::default()), NO_ERRORS);
    }

    #[test]
    fn test_subject_for_many_items() {
        let mut items = BTreeMap::new();
        for id in [1, 2] {
            items.insert(
                id,
                ItemErrors {
                    assignee: "Alice".into(),
                    work_item_id: id,
                    title: "t".into(),
                    url: String::new(),
                    failures: Vec::new(),
                },
            );
        }
        assert_eq!(subject(&items), "2 Work Items need attention");
    }
}
