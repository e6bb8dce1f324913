use std::collections::BTreeMap;

use serde_json::{json, Value};

use super::command_registry::{
    CommandSpec, DRAG_COMMAND, NO_ARG_COMMANDS, NUMBER_COMMANDS, RAW_ARG_COMMANDS,
    SELECT_COMMAND, SINGLE_PATH_COMMANDS,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub action: String,
    pub raw: String,
    pub command_args: BTreeMap<String, Value>,
}

impl Intent {
    fn new(action: &str, raw: &str) -> Self {
        Self {
            action: action.to_string(),
            raw: raw.to_string(),
            command_args: BTreeMap::new(),
        }
    }

    fn invalid(command: &str, raw: &str, error: String) -> Self {
        let mut intent = Self::new("invalid", raw);
        intent
            .command_args
            .insert("command".to_string(), Value::String(command.to_string()));
        intent
            .command_args
            .insert("error".to_string(), Value::String(error));
        intent
    }

    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.command_args.get(key).and_then(Value::as_str)
    }

    pub fn arg_f64(&self, key: &str) -> Option<f64> {
        self.command_args.get(key).and_then(Value::as_f64)
    }
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<&'static str> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

fn parse_path_args(arg: &str) -> Vec<String> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg
            .split_whitespace()
            .map(str::to_string)
            .filter(|value| !value.is_empty())
            .collect(),
    }
}

fn parse_single_path_arg(arg: &str) -> String {
    let parts = parse_path_args(arg);
    match parts.len() {
        0 => String::new(),
        1 => parts[0].clone(),
        _ => parts.join(" "),
    }
}

fn parse_numbers(arg: &str) -> Result<Vec<f64>, String> {
    arg.split(|ch: char| ch.is_whitespace() || ch == ',')
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| format!("'{part}' is not a number"))
        })
        .collect()
}

pub fn parse_intent(text: &str) -> Intent {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return Intent::new("noop", text);
    }

    if let Some(slash_tail) = raw_trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        if command_len > 0 {
            let command = slash_tail[..command_len].to_ascii_lowercase();
            let remainder = &slash_tail[command_len..];
            let arg = remainder.trim();

            if let Some(action) = find_action(&command, RAW_ARG_COMMANDS) {
                let mut intent = Intent::new(action, text);
                intent
                    .command_args
                    .insert("text".to_string(), Value::String(arg.to_string()));
                return intent;
            }

            if let Some(action) = find_action(&command, SINGLE_PATH_COMMANDS) {
                let mut intent = Intent::new(action, text);
                intent.command_args.insert(
                    "path".to_string(),
                    Value::String(parse_single_path_arg(arg)),
                );
                return intent;
            }

            if let Some(action) = find_action(&command, NUMBER_COMMANDS) {
                return match parse_numbers(arg) {
                    Ok(values) if values.len() == 1 => {
                        let mut intent = Intent::new(action, text);
                        intent
                            .command_args
                            .insert("value".to_string(), json!(values[0]));
                        intent
                    }
                    Ok(_) => Intent::invalid(
                        &command,
                        text,
                        format!("/{command} takes exactly one number"),
                    ),
                    Err(err) => Intent::invalid(&command, text, err),
                };
            }

            if command == SELECT_COMMAND.command {
                return match arg.parse::<u64>() {
                    Ok(index) if index >= 1 => {
                        let mut intent = Intent::new(SELECT_COMMAND.action, text);
                        intent
                            .command_args
                            .insert("index".to_string(), json!(index - 1));
                        intent
                    }
                    _ => Intent::invalid(
                        &command,
                        text,
                        "/select takes a template number starting at 1".to_string(),
                    ),
                };
            }

            if command == DRAG_COMMAND.command {
                return match parse_numbers(arg) {
                    Ok(values) if values.len() == 4 => {
                        let mut intent = Intent::new(DRAG_COMMAND.action, text);
                        intent
                            .command_args
                            .insert("from".to_string(), json!([values[0], values[1]]));
                        intent
                            .command_args
                            .insert("to".to_string(), json!([values[2], values[3]]));
                        intent
                    }
                    Ok(_) => Intent::invalid(
                        &command,
                        text,
                        "/drag takes four numbers: x0 y0 x1 y1".to_string(),
                    ),
                    Err(err) => Intent::invalid(&command, text, err),
                };
            }

            if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
                return Intent::new(action, text);
            }

            let mut intent = Intent::new("unknown", text);
            intent
                .command_args
                .insert("command".to_string(), Value::String(command));
            intent
                .command_args
                .insert("arg".to_string(), Value::String(arg.to_string()));
            return intent;
        }
    }

    let mut intent = Intent::new("set_topic", text);
    intent
        .command_args
        .insert("text".to_string(), Value::String(raw_trimmed.to_string()));
    intent
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::parse_intent;

    #[test]
    fn plain_text_sets_topic() {
        let intent = parse_intent("  How I learned to code in 30 days ");
        assert_eq!(intent.action, "set_topic");
        assert_eq!(
            intent.command_args["text"],
            json!("How I learned to code in 30 days")
        );
    }

    #[test]
    fn blank_input_is_noop() {
        assert_eq!(parse_intent("   ").action, "noop");
    }

    #[test]
    fn raw_text_commands_keep_spacing_inside() {
        let headline = parse_intent("/headline How I   Learned X");
        assert_eq!(headline.action, "set_headline");
        assert_eq!(headline.arg_str("text"), Some("How I   Learned X"));

        let highlight = parse_intent("/highlight Learned");
        assert_eq!(highlight.action, "set_highlight");
        assert_eq!(highlight.arg_str("text"), Some("Learned"));

        let cleared = parse_intent("/highlight");
        assert_eq!(cleared.arg_str("text"), Some(""));
    }

    #[test]
    fn image_path_supports_quotes() {
        let intent = parse_intent("/image \"/tmp/my face.jpg\"");
        assert_eq!(intent.action, "set_image");
        assert_eq!(intent.command_args["path"], json!("/tmp/my face.jpg"));

        let preview = parse_intent("/preview");
        assert_eq!(preview.action, "preview");
        assert_eq!(preview.command_args["path"], json!(""));
    }

    #[test]
    fn select_is_one_based() {
        let intent = parse_intent("/select 2");
        assert_eq!(intent.action, "select_template");
        assert_eq!(intent.command_args["index"], json!(1));

        assert_eq!(parse_intent("/select 0").action, "invalid");
        assert_eq!(parse_intent("/select two").action, "invalid");
    }

    #[test]
    fn numeric_commands_validate_arity() {
        let scale = parse_intent("/scale 1.4");
        assert_eq!(scale.action, "set_scale");
        assert_eq!(scale.arg_f64("value"), Some(1.4));

        let width = parse_intent("/width 640");
        assert_eq!(width.action, "set_container_width");
        assert_eq!(width.arg_f64("value"), Some(640.0));

        let bad = parse_intent("/scale big");
        assert_eq!(bad.action, "invalid");
        assert_eq!(bad.command_args["command"], json!("scale"));
        assert_eq!(parse_intent("/scale 1 2").action, "invalid");
        assert_eq!(parse_intent("/scale NaN").action, "invalid");
    }

    #[test]
    fn drag_takes_two_points() {
        let drag = parse_intent("/drag 10 20, 40 -5");
        assert_eq!(drag.action, "drag");
        assert_eq!(drag.command_args["from"], json!([10.0, 20.0]));
        assert_eq!(drag.command_args["to"], json!([40.0, -5.0]));

        assert_eq!(parse_intent("/drag 1 2 3").action, "invalid");
    }

    #[test]
    fn no_arg_commands_and_aliases() {
        assert_eq!(parse_intent("/generate").action, "generate");
        assert_eq!(parse_intent("/reopen").action, "reopen_editor");
        assert_eq!(parse_intent("/back").action, "back");
        assert_eq!(parse_intent("/BG_TOGGLE").action, "toggle_background_removal");
        assert_eq!(parse_intent("/export").action, "export");
        assert_eq!(parse_intent("/quit").action, "quit");
        assert_eq!(parse_intent("/exit").action, "quit");
    }

    #[test]
    fn unrecognized_slash_command_is_reported_not_treated_as_topic() {
        let intent = parse_intent("/Upscale 4x now");
        assert_eq!(intent.action, "unknown");
        assert_eq!(intent.command_args["command"], json!("upscale"));
        assert_eq!(intent.command_args["arg"], json!("4x now"));
    }
}
