use reqflow_core::Level;

use crate::RowContext;

/// What each hierarchy level should read like, fed to the prompt.
fn level_contract(level: Level) -> &'static str {
    match level {
        Level::Flow => {
            "user flows: end-to-end journeys through the product, named after \
what the user accomplishes (\"Sign up\", \"Checkout\")"
        }
        Level::HighLevel => {
            "high-level requirements: observable capabilities the flow needs, \
each one something a product owner could accept or reject. No implementation \
detail, no UI gestures"
        }
        Level::LowLevel => {
            "low-level requirements: concrete, implementable behaviors a \
developer can build and demo in isolation. Each should name the specific \
mechanism (\"Validate email format server-side\"), not restate the parent"
        }
        Level::TestCase => {
            "test cases: verifiable scenarios with an unambiguous pass/fail \
outcome. Cover the happy path first, then the failure modes the requirement \
implies"
        }
    }
}

pub fn system_prompt(child_level: Level) -> String {
    format!(
        "You are a requirements analyst decomposing software specifications. \
Given one parent requirement, produce its direct children: {}.\n\n\
Rules:\n\
- 3 to 6 children. Fewer is fine when the parent is genuinely narrow; never pad.\n\
- Children must partition the parent: no overlap, no child that restates it.\n\
- Stay at the child level. Do not skip ahead to deeper detail.\n\
- Names are short noun or verb phrases; descriptions are one or two sentences.\n\n\
Output ONLY a JSON array. Each item: {{\"name\":\"<name>\",\"description\":\"<description>\"}}. \
If the parent cannot be decomposed, output [].\n\
Output ONLY the JSON array, nothing else.",
        level_contract(child_level)
    )
}

/// Compact text rendering of the row being decomposed.
pub fn user_message(ctx: &RowContext, child_level: Level) -> String {
    let mut out = String::with_capacity(256);
    out.push_str("PARENT (");
    out.push_str(&ctx.table_title);
    out.push_str(", row ");
    out.push_str(&(ctx.row_index + 1).to_string());
    out.push_str("):\n\"");
    out.push_str(&ctx.name);
    out.push('"');
    if !ctx.description.is_empty() {
        out.push_str(" | ");
        // Truncate long descriptions
        if ctx.description.chars().count() > 200 {
            out.extend(ctx.description.chars().take(200));
            out.push_str("...");
        } else {
            out.push_str(&ctx.description);
        }
    }
    out.push_str("\n\nProduce the ");
    out.push_str(child_level.title());
    out.push_str(" for this parent.\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RowContext {
        RowContext {
            project_uiid: "proj-1".into(),
            row_uiid: "f1".into(),
            name: "Checkout".into(),
            description: "User pays for the cart".into(),
            table_title: "User Flows".into(),
            row_index: 0,
            level: Level::Flow,
        }
    }

    #[test]
    fn user_message_carries_the_row_summary() {
        let msg = user_message(&ctx(), Level::HighLevel);
        assert!(msg.contains("\"Checkout\""));
        assert!(msg.contains("User Flows, row 1"));
        assert!(msg.contains("User pays for the cart"));
        assert!(msg.contains("High-Level Requirements"));
    }

    #[test]
    fn long_descriptions_are_truncated() {
        let mut c = ctx();
        c.description = "x".repeat(500);
        let msg = user_message(&c, Level::HighLevel);
        assert!(msg.contains(&format!("{}...", "x".repeat(200))));
    }

    #[test]
    fn system_prompt_pins_the_output_contract() {
        let p = system_prompt(Level::TestCase);
        assert!(p.contains("JSON array"));
        assert!(p.contains("pass/fail"));
    }
}
