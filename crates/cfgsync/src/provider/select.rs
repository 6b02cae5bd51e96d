//! Interactive choice of a (provider, model) pair for a pointer record.

use super::validate::AvailableProviders;
use crate::context::SessionContext;
use crate::prompt::{Prompted, Prompter, ask_until, parse_index};

/// List every usable combination and let the user pick one.
///
/// Anything but `Value` leaves the pointer untouched. With nothing to choose
/// from the answer is `Back`; `Quit` and `Closed` are passed through so the
/// caller can stop asking about further pointers.
pub fn choose_pointer(
    available: &AvailableProviders,
    label: &str,
    prompter: &mut dyn Prompter,
    ctx: &SessionContext,
) -> Prompted<(String, String)> {
    let combos = available.combinations();
    if combos.is_empty() {
        prompter.say("No provider has an API key, an endpoint and a model yet.");
        return Prompted::Back;
    }
    prompter.say(&format!("Select the model for {label}:"));
    for (i, (provider, model)) in combos.iter().enumerate() {
        prompter.say(&format!("  {}. {provider} / {model}", i + 1));
    }
    let prompt = format!("Choice [1-{}, b, q]: ", combos.len());
    match ask_until(prompter, &prompt, ctx.max_attempts, |a| parse_index(a, combos.len())) {
        Prompted::Value(i) => {
            let (provider, model) = combos[i];
            tracing::debug!("{} -> {} / {}", label, provider, model);
            Prompted::Value((provider.to_string(), model.to_string()))
        }
        Prompted::Back => Prompted::Back,
        Prompted::Quit => Prompted::Quit,
        Prompted::Closed => Prompted::Closed,
        Prompted::Exhausted => Prompted::Exhausted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Layout;
    use crate::prompt::ScriptedPrompter;
    use crate::provider::available_providers;
    use serde_yaml::Value;

    fn available() -> AvailableProviders {
        let doc: Value = serde_yaml::from_str(
            r#"
api:
  a:
    endpoint: https://a.io
    api_key: key-a
    models:
      model_1: a-small
      model_2: a-large
  b:
    endpoint: https://b.io
    api_key: key-b
    models:
      model_1: b-one
"#,
        )
        .expect("yaml");
        available_providers(&doc, &Layout::default())
    }

    #[test]
    fn picks_by_number() {
        let mut p = ScriptedPrompter::new(["3"]);
        let got = choose_pointer(&available(), "active_model", &mut p, &SessionContext::default());
        assert_eq!(got, Prompted::Value(("b".to_string(), "b-one".to_string())));
        assert!(p.saw("2. a / a-large"));
    }

    #[test]
    fn invalid_answers_then_back_leave_nothing_chosen() {
        let mut p = ScriptedPrompter::new(["0", "nine", "b"]);
        let got = choose_pointer(&available(), "active_model", &mut p, &SessionContext::default());
        assert_eq!(got, Prompted::Back);
        assert!(p.saw("attempt 2 of 5"));
    }

    #[test]
    fn quit_is_passed_through() {
        let mut p = ScriptedPrompter::new(["q", "1"]);
        let got = choose_pointer(&available(), "active_model", &mut p, &SessionContext::default());
        assert_eq!(got, Prompted::Quit);
        assert_eq!(p.remaining(), 1);
    }

    #[test]
    fn exhaustion_returns_none() {
        let mut p = ScriptedPrompter::new(["x"; 5]);
        let ctx = SessionContext::default();
        assert_eq!(choose_pointer(&available(), "m", &mut p, &ctx), Prompted::Exhausted);
        assert!(p.saw("Too many invalid answers"));
    }

    #[test]
    fn nothing_to_choose() {
        let mut p = ScriptedPrompter::new(["1"]);
        let got = choose_pointer(
            &AvailableProviders::default(),
            "m",
            &mut p,
            &SessionContext::default(),
        );
        assert_eq!(got, Prompted::Back);
        assert_eq!(p.remaining(), 1);
    }
}
