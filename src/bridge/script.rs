// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Script snippets injected into the hosted page.
//!
//! Every argument is rendered as a JSON literal, so values such as device
//! names with quotes or newlines cannot change the shape of the script.

use serde_json::Value;

/// Page object exposing the bridge entry points.
pub const BRIDGE_OBJECT: &str = "window.connectivityBridge";

/// Entry points the hosted page implements on [`BRIDGE_OBJECT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFunction {
    ReceiveMessage,
    UpdateConnectionStatus,
    UpdateDeviceList,
    UpdateNetworkList,
}

impl PageFunction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ReceiveMessage => "receiveMessage",
            Self::UpdateConnectionStatus => "updateConnectionStatus",
            Self::UpdateDeviceList => "updateDeviceList",
            Self::UpdateNetworkList => "updateNetworkList",
        }
    }
}

/// Render `value` as a JavaScript literal.
pub fn literal(value: &Value) -> String {
    // U+2028/U+2029 are valid in JSON strings but terminate JS string literals
    // in older engines.
    value
        .to_string()
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

fn argument_list(args: &[Value]) -> String {
    args.iter().map(literal).collect::<Vec<_>>().join(", ")
}

/// Script invoking a bridge entry point if the page defines it.
pub fn bridge_call(function: PageFunction, args: &[Value]) -> String {
    let name = function.name();
    with_completion(&format!(
        "if ({obj} && typeof {obj}.{name} === 'function') {{ {obj}.{name}({args}); }}",
        obj = BRIDGE_OBJECT,
        name = name,
        args = argument_list(args),
    ))
}

/// Script invoking the global function at dotted `path`.
///
/// Returns `None` if `path` is not a plain dotted identifier path.
pub fn global_call(path: &str, args: &[Value]) -> Option<String> {
    let segments: Vec<&str> = path.split('.').collect();
    if !segments.iter().all(|s| is_identifier(s)) {
        return None;
    }

    // Guard every intermediate object so a missing one is a no-op.
    let mut guards = vec![format!("typeof {} !== 'undefined'", segments[0])];
    for end in 2..segments.len() {
        guards.push(segments[..end].join("."));
    }
    guards.push(format!("typeof {} === 'function'", path));
    if segments.len() == 1 {
        guards.remove(0);
    }

    Some(with_completion(&format!(
        "if ({}) {{ {}({}); }}",
        guards.join(" && "),
        path,
        argument_list(args)
    )))
}

/// Append the `true;` completion value the page host expects.
pub fn with_completion(code: &str) -> String {
    format!("{}\ntrue;", code)
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bridge_call_shape() {
        let script = bridge_call(
            PageFunction::UpdateConnectionStatus,
            &[json!(true), json!(false), json!("DeviceX"), Value::Null],
        );
        assert!(script.contains("typeof window.connectivityBridge.updateConnectionStatus === 'function'"));
        assert!(script.contains("updateConnectionStatus(true, false, \"DeviceX\", null)"));
        assert!(script.ends_with("\ntrue;"));
    }

    #[test]
    fn test_literal_escapes_hostile_names() {
        let name = "Bob's \"Phone\"\n</script>\u{2028}";
        let rendered = literal(&json!(name));
        assert!(!rendered.contains('\n'));
        assert!(!rendered.contains('\u{2028}'));
        assert!(rendered.contains("\\u2028"));
        assert!(rendered.contains("\\\"Phone\\\""));

        // Still decodes to the original string.
        let back: String = serde_json::from_str(&rendered.replace("\\u2028", "\u{2028}")).unwrap();
        assert_eq!(back, name);
    }

    #[test]
    fn test_global_call_paths() {
        let script = global_call("app.ui.refresh", &[json!({"force": true})]).unwrap();
        assert!(script.starts_with(
            "if (typeof app !== 'undefined' && app.ui && typeof app.ui.refresh === 'function')"
        ));
        assert!(script.contains("app.ui.refresh({\"force\":true})"));

        let script = global_call("refresh", &[]).unwrap();
        assert!(script.starts_with("if (typeof refresh === 'function') { refresh(); }"));

        assert!(global_call("alert(1);x", &[]).is_none());
        assert!(global_call("a..b", &[]).is_none());
        assert!(global_call("", &[]).is_none());
        assert!(global_call("1abc", &[]).is_none());
    }

    #[test]
    fn test_completion_suffix() {
        assert_eq!(with_completion("x = 1"), "x = 1\ntrue;");
    }
}
