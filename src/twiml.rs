//! TwiML generation for the authorization voice menu.
//!
//! Uses `quick-xml`'s writer API. The spoken prompts are Spanish (`alice` /
//! `es-ES`), matching the resident audience.

use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

const VOICE: &str = "alice";
const LANGUAGE: &str = "es-ES";

/// One digit, then the resident is done talking to us.
const GATHER_NUM_DIGITS: &str = "1";
const GATHER_TIMEOUT_SECONDS: &str = "8";

pub const VOICE_PATH: &str = "/twilio/voice";
pub const HANDLE_INPUT_PATH: &str = "/twilio/voice/handle-input";

/// Renders the provider-facing voice menu documents. Implemented by the
/// production TwiML builder and by a test stub.
pub trait TwimlBuilder: Send + Sync {
    /// Initial menu: identify the visitor, gather one digit, and if nothing
    /// arrives before the gather timeout, say goodbye and hang up.
    fn voice_prompt(
        &self,
        resident_name: &str,
        visitor_name: &str,
        visit_id: &str,
        base_url: Option<&str>,
    ) -> String;

    /// Per-digit response: `1` confirm, `2` reject, `3` replay the menu,
    /// anything else ends the call.
    fn digit_response(
        &self,
        digit: &str,
        resident_name: &str,
        visitor_name: &str,
        visit_id: &str,
        base_url: Option<&str>,
    ) -> String;
}

/// Reduce a raw `Digits` value to the single digit the menu understands:
/// whitespace trimmed, non-digits dropped, first digit only. Anything that
/// leaves nothing behind becomes the empty string, which the menu treats as
/// an invalid option.
pub fn normalize_digit(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(char::is_ascii_digit)
        .take(1)
        .collect()
}

/// Query string every menu URL carries so the follow-up webhook can keep
/// talking about the same visit.
pub fn menu_query(resident_name: &str, visitor_name: &str, visit_id: &str) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("residentName", resident_name)
        .append_pair("visitorName", visitor_name)
        .append_pair("visitId", visit_id)
        .finish()
}

pub struct TwilioTwiml;

impl TwimlBuilder for TwilioTwiml {
    fn voice_prompt(
        &self,
        resident_name: &str,
        visitor_name: &str,
        visit_id: &str,
        base_url: Option<&str>,
    ) -> String {
        let visitor = if visitor_name.trim().is_empty() {
            "no identificado"
        } else {
            visitor_name
        };
        let prompt = format!(
            "Hola. Se solicita autorizacion de ingreso para el visitante {visitor}. \
             Estimado residente {resident_name}, \
             si desea autorizar el ingreso, presione 1. \
             Si desea rechazar el ingreso, presione 2. \
             Si desea escuchar nuevamente la informacion, presione 3."
        );

        let query = menu_query(resident_name, visitor_name, visit_id);
        let action_url = join_url(base_url, HANDLE_INPUT_PATH, &query);

        let mut writer = new_document();
        let mut gather = BytesStart::new("Gather");
        gather.push_attribute(("numDigits", GATHER_NUM_DIGITS));
        gather.push_attribute(("action", action_url.as_str()));
        gather.push_attribute(("method", "POST"));
        gather.push_attribute(("timeout", GATHER_TIMEOUT_SECONDS));
        writer.write_event(Event::Start(gather)).unwrap();
        say(&mut writer, &prompt);
        writer
            .write_event(Event::End(BytesEnd::new("Gather")))
            .unwrap();

        // No digit before the timeout: close the call audibly, never hang
        // in silence.
        say(
            &mut writer,
            "No se recibio ninguna respuesta. La solicitud quedara pendiente. Adios.",
        );
        hangup(&mut writer);
        finish(writer)
    }

    fn digit_response(
        &self,
        digit: &str,
        resident_name: &str,
        visitor_name: &str,
        visit_id: &str,
        base_url: Option<&str>,
    ) -> String {
        let query = menu_query(resident_name, visitor_name, visit_id);
        let mut writer = new_document();

        match digit {
            "1" => {
                say(
                    &mut writer,
                    "Has autorizado el ingreso del visitante. Muchas gracias.",
                );
                hangup(&mut writer);
            }
            "2" => {
                say(
                    &mut writer,
                    "Has rechazado el ingreso del visitante. Muchas gracias.",
                );
                hangup(&mut writer);
            }
            "3" => {
                say(&mut writer, "Reproduciendo nuevamente la informacion.");
                redirect(&mut writer, &join_url(base_url, VOICE_PATH, &query));
            }
            _ => {
                // Fail closed instead of looping the menu forever.
                say(&mut writer, "Opcion no valida. Adios.");
                hangup(&mut writer);
            }
        }
        finish(writer)
    }
}

type XmlWriter = Writer<Cursor<Vec<u8>>>;

fn new_document() -> XmlWriter {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .unwrap();
    writer
        .write_event(Event::Start(BytesStart::new("Response")))
        .unwrap();
    writer
}

fn finish(mut writer: XmlWriter) -> String {
    writer
        .write_event(Event::End(BytesEnd::new("Response")))
        .unwrap();
    String::from_utf8(writer.into_inner().into_inner()).expect("twiml is utf-8")
}

fn say(writer: &mut XmlWriter, text: &str) {
    let mut el = BytesStart::new("Say");
    el.push_attribute(("voice", VOICE));
    el.push_attribute(("language", LANGUAGE));
    writer.write_event(Event::Start(el)).unwrap();
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .unwrap();
    writer
        .write_event(Event::End(BytesEnd::new("Say")))
        .unwrap();
}

fn redirect(writer: &mut XmlWriter, url: &str) {
    writer
        .write_event(Event::Start(BytesStart::new("Redirect")))
        .unwrap();
    writer
        .write_event(Event::Text(BytesText::new(url)))
        .unwrap();
    writer
        .write_event(Event::End(BytesEnd::new("Redirect")))
        .unwrap();
}

fn hangup(writer: &mut XmlWriter) {
    writer
        .write_event(Event::Empty(BytesStart::new("Hangup")))
        .unwrap();
}

fn join_url(base_url: Option<&str>, path: &str, query: &str) -> String {
    match base_url {
        Some(base) => format!("{}{path}?{query}", base.trim_end_matches('/')),
        None => format!("{path}?{query}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: Option<&str> = Some("https://garita.example.com");

    #[test]
    fn digit_normalization_keeps_first_digit_only() {
        assert_eq!(normalize_digit(" 1abc"), "1");
        assert_eq!(normalize_digit("1\n"), "1");
        assert_eq!(normalize_digit("  1 "), "1");
        assert_eq!(normalize_digit("22"), "2");
        assert_eq!(normalize_digit(""), "");
        assert_eq!(normalize_digit("xyz"), "");
    }

    #[test]
    fn prompt_gathers_one_digit_with_timeout() {
        let twiml = TwilioTwiml.voice_prompt("Maria Paz", "Juan Perez", "41", BASE);
        assert!(twiml.starts_with("<?xml"));
        assert!(twiml.contains(r#"numDigits="1""#));
        assert!(twiml.contains(r#"timeout="8""#));
        assert!(twiml.contains("presione 1"));
        assert!(twiml.contains("Juan Perez"));
        // Timeout fallback speaks before hanging up.
        assert!(twiml.contains("No se recibio ninguna respuesta"));
        assert!(twiml.contains("<Hangup/>"));
    }

    #[test]
    fn prompt_action_url_carries_the_visit() {
        let twiml = TwilioTwiml.voice_prompt("Maria Paz", "Juan", "41", BASE);
        // quick-xml escapes the ampersands inside the attribute value.
        assert!(twiml.contains(
            "action=\"https://garita.example.com/twilio/voice/handle-input?\
             residentName=Maria+Paz&amp;visitorName=Juan&amp;visitId=41\""
        ));
    }

    #[test]
    fn prompt_defaults_unnamed_visitors() {
        let twiml = TwilioTwiml.voice_prompt("Maria Paz", "  ", "41", BASE);
        assert!(twiml.contains("no identificado"));
    }

    #[test]
    fn digit_one_confirms_and_hangs_up() {
        let twiml = TwilioTwiml.digit_response("1", "Maria", "Juan", "41", BASE);
        assert!(twiml.contains("Has autorizado"));
        assert!(twiml.contains("<Hangup/>"));
        assert!(!twiml.contains("<Redirect>"));
    }

    #[test]
    fn digit_two_rejects_and_hangs_up() {
        let twiml = TwilioTwiml.digit_response("2", "Maria", "Juan", "41", BASE);
        assert!(twiml.contains("Has rechazado"));
        assert!(twiml.contains("<Hangup/>"));
    }

    #[test]
    fn digit_three_redirects_back_to_the_menu() {
        let twiml = TwilioTwiml.digit_response("3", "Maria", "Juan", "41", BASE);
        assert!(twiml.contains("<Redirect>"));
        assert!(twiml.contains("/twilio/voice?"));
        assert!(!twiml.contains("<Hangup/>"));
    }

    #[test]
    fn unknown_digit_fails_closed() {
        for digit in ["9", "", "abc"] {
            let twiml = TwilioTwiml.digit_response(digit, "Maria", "Juan", "41", BASE);
            assert!(twiml.contains("Opcion no valida"), "digit {digit:?}");
            assert!(twiml.contains("<Hangup/>"), "digit {digit:?}");
            assert!(!twiml.contains("<Redirect>"), "digit {digit:?}");
        }
    }
}
