//! Sequence command catalog and envelope builder.
//!
//! Every command turns into exactly one behaviors start node wrapped in a
//! sequence, JSON-string-encoded into the preview request the behaviors
//! endpoint expects. The route layer forwards command names verbatim; this
//! module is where unknown names are rejected.

use serde_json::{json, Map, Value};

use crate::models::Device;

use super::AlexaError;

const SEQUENCE_TYPE: &str = "com.amazon.alexa.behaviors.model.Sequence";
pub const OPERATION_NODE_TYPE: &str =
    "com.amazon.alexa.behaviors.model.OpaquePayloadOperationNode";

/// Skill id the text-command node routes through
const TEXT_COMMAND_SKILL_ID: &str = "amzn1.ask.1p.tellalexa";

/// Default push-notification title when the value carries none
const DEFAULT_NOTIFICATION_TITLE: &str = "alexa-bridge";

/// Announcements expire if a device cannot play them promptly
const ANNOUNCEMENT_EXPIRES_AFTER: &str = "PT5S";

/// Accepted category ids for the curated text-to-speech command
const CURATED_TTS_VALUES: &[&str] = &[
    "goodbye",
    "confirmations",
    "goodnight",
    "iamhome",
    "traffic",
    "wakeup",
    "weather",
];

/// Build the single start node for `command` targeted at `device`.
///
/// `all_devices` backs the `...All` command variants. Unknown command names
/// and malformed values are rejected here with typed errors.
pub fn build_start_node(
    command: &str,
    value: &Value,
    device: &Device,
    all_devices: &[Device],
    locale: &str,
) -> Result<Value, AlexaError> {
    let mut payload = base_payload(device, locale);

    let node_type = match command {
        "weather" => "Alexa.Weather.Play",
        "traffic" => "Alexa.Traffic.Play",
        "flashbriefing" => "Alexa.FlashBriefing.Play",
        "goodmorning" => "Alexa.GoodMorning.Play",
        "funfact" => "Alexa.FunFact.Play",
        "joke" => "Alexa.Joke.Play",
        "cleanup" => "Alexa.CleanUp.Play",
        "singasong" => "Alexa.SingASong.Play",
        "tellstory" => "Alexa.TellStory.Play",
        "calendarToday" => "Alexa.Calendar.PlayToday",
        "calendarTomorrow" => "Alexa.Calendar.PlayTomorrow",
        "calendarNext" => "Alexa.Calendar.PlayNext",
        "speak" => {
            let text = value_as_string(value).ok_or_else(|| {
                AlexaError::InvalidRequest("speak requires a text value".to_string())
            })?;
            payload.insert("textToSpeak".to_string(), Value::String(text));
            "Alexa.Speak"
        }
        "textCommand" => {
            let text = value_as_string(value).ok_or_else(|| {
                AlexaError::InvalidRequest("textCommand requires a text value".to_string())
            })?;
            payload.insert("text".to_string(), Value::String(text));
            payload.insert(
                "skillId".to_string(),
                Value::String(TEXT_COMMAND_SKILL_ID.to_string()),
            );
            "Alexa.TextCommand"
        }
        "curatedtts" => {
            let category = value_as_string(value).unwrap_or_default();
            if !CURATED_TTS_VALUES.contains(&category.as_str()) {
                return Err(AlexaError::InvalidRequest(format!(
                    "curatedtts value must be one of {:?}, got {:?}",
                    CURATED_TTS_VALUES, category
                )));
            }
            payload.insert(
                "cannedTtsStringId".to_string(),
                Value::String(format!(
                    "alexa.cannedtts.speak.curatedtts-category-{}/alexa.cannedtts.speak.curatedtts-random",
                    category
                )),
            );
            "Alexa.CannedTts.Speak"
        }
        "volume" => {
            let volume = value_as_volume(value)?;
            payload.insert("value".to_string(), json!(volume));
            "Alexa.DeviceControls.Volume"
        }
        "deviceStop" | "deviceStopAll" => {
            let targets = if command == "deviceStopAll" {
                all_devices
            } else {
                std::slice::from_ref(device)
            };
            payload.insert("devices".to_string(), device_list(targets));
            payload.insert("isAssociatedDevice".to_string(), Value::Bool(false));
            "Alexa.DeviceControls.Stop"
        }
        "deviceDoNotDisturb" | "deviceDoNotDisturbAll" => {
            let targets = if command == "deviceDoNotDisturbAll" {
                all_devices
            } else {
                std::slice::from_ref(device)
            };
            payload.insert("devices".to_string(), device_list(targets));
            payload.insert("enabled".to_string(), Value::Bool(value_as_bool(value)));
            "Alexa.DeviceControls.DoNotDisturb"
        }
        "fireTVTurnOn" => "Alexa.Operation.Power.TurnOn",
        "fireTVTurnOff" => "Alexa.Operation.Power.TurnOff",
        // Toggle variant: the value decides the direction
        "fireTVTurnOnOff" => {
            if value_as_bool(value) {
                "Alexa.Operation.Power.TurnOn"
            } else {
                "Alexa.Operation.Power.TurnOff"
            }
        }
        "fireTVPauseVideo" => "Alexa.Operation.Playback.Pause",
        "fireTVResumeVideo" => "Alexa.Operation.Playback.Play",
        "fireTVNavigateHome" => "Alexa.Operation.Navigation.GoToHome",
        "skill" => {
            let skill_id = value_as_string(value).ok_or_else(|| {
                AlexaError::InvalidRequest("skill requires a skill id value".to_string())
            })?;
            payload.insert(
                "targetDevice".to_string(),
                json!({
                    "deviceType": device.device_type,
                    "deviceSerialNumber": device.serial_number,
                }),
            );
            payload.insert(
                "connectionRequest".to_string(),
                json!({
                    "uri": format!("connection://AMAZON.Launch/{}", skill_id),
                    "input": {},
                }),
            );
            "Alexa.Operation.SkillConnections.Launch"
        }
        "notification" => {
            let (title, text) = title_and_text(value).ok_or_else(|| {
                AlexaError::InvalidRequest(
                    "notification requires a text value or a {title, text} object".to_string(),
                )
            })?;
            payload.insert("notificationMessage".to_string(), Value::String(text));
            payload.insert(
                "title".to_string(),
                Value::String(title.unwrap_or_else(|| DEFAULT_NOTIFICATION_TITLE.to_string())),
            );
            payload.insert(
                "alexaUrl".to_string(),
                Value::String("#v2/behaviors".to_string()),
            );
            "Alexa.Notifications.SendMobilePush"
        }
        "announcement" | "ssml" => {
            let (title, text) = title_and_text(value).ok_or_else(|| {
                AlexaError::InvalidRequest(format!(
                    "{} requires a text value or a {{title, text}} object",
                    command
                ))
            })?;
            let speak_type = if command == "ssml" { "ssml" } else { "text" };
            payload.insert(
                "expireAfter".to_string(),
                Value::String(ANNOUNCEMENT_EXPIRES_AFTER.to_string()),
            );
            payload.insert(
                "content".to_string(),
                json!([{
                    "locale": locale,
                    "display": {
                        "title": title.unwrap_or_else(|| "Announcement".to_string()),
                        "body": text.clone(),
                    },
                    "speak": {
                        "type": speak_type,
                        "value": text,
                    },
                }]),
            );
            payload.insert(
                "target".to_string(),
                json!({
                    "customerId": device.device_owner_customer_id,
                    "devices": [{
                        "deviceSerialNumber": device.serial_number,
                        "deviceTypeId": device.device_type,
                    }],
                }),
            );
            "AlexaAnnouncement"
        }
        other => return Err(AlexaError::UnknownCommand(other.to_string())),
    };

    Ok(json!({
        "@type": OPERATION_NODE_TYPE,
        "type": node_type,
        "operationPayload": Value::Object(payload),
    }))
}

/// Wrap a start node in the sequence envelope
pub fn build_sequence(start_node: Value) -> Value {
    json!({
        "@type": SEQUENCE_TYPE,
        "startNode": start_node,
    })
}

/// Build the behaviors-preview request body. The sequence itself travels
/// string-encoded inside the JSON body.
pub fn preview_request(sequence: &Value) -> Result<Value, AlexaError> {
    let sequence_json = serde_json::to_string(sequence)
        .map_err(|e| AlexaError::InvalidResponse(format!("Failed to encode sequence: {}", e)))?;
    Ok(json!({
        "behaviorId": "PREVIEW",
        "sequenceJson": sequence_json,
        "status": "ENABLED",
    }))
}

fn base_payload(device: &Device, locale: &str) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert(
        "deviceType".to_string(),
        Value::String(device.device_type.clone()),
    );
    payload.insert(
        "deviceSerialNumber".to_string(),
        Value::String(device.serial_number.clone()),
    );
    payload.insert(
        "customerId".to_string(),
        Value::String(device.device_owner_customer_id.clone().unwrap_or_default()),
    );
    payload.insert("locale".to_string(), Value::String(locale.to_string()));
    payload
}

fn device_list(devices: &[Device]) -> Value {
    Value::Array(
        devices
            .iter()
            .map(|d| {
                json!({
                    "deviceSerialNumber": d.serial_number,
                    "deviceType": d.device_type,
                })
            })
            .collect(),
    )
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_as_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() != Some(0),
        Value::String(s) => s == "true" || s == "1",
        _ => false,
    }
}

fn value_as_volume(value: &Value) -> Result<i64, AlexaError> {
    let volume = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    match volume {
        Some(v) if (0..=100).contains(&v) => Ok(v),
        _ => Err(AlexaError::InvalidRequest(format!(
            "volume requires an integer between 0 and 100, got {}",
            value
        ))),
    }
}

/// Notification and announcement values are either a bare string or an
/// object carrying `text` and optionally `title`.
fn title_and_text(value: &Value) -> Option<(Option<String>, String)> {
    match value {
        Value::String(s) => Some((None, s.clone())),
        Value::Object(map) => {
            let text = map.get("text").and_then(Value::as_str)?.to_string();
            let title = map
                .get("title")
                .and_then(Value::as_str)
                .map(str::to_string);
            Some((title, text))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(name: &str, serial: &str) -> Device {
        serde_json::from_value(json!({
            "accountName": name,
            "serialNumber": serial,
            "deviceType": "A32DOYMUN6DTXA",
            "deviceOwnerCustomerId": "A1CUSTOMER",
        }))
        .expect("Failed to build test device")
    }

    #[test]
    fn test_speak_node_shape() {
        let kitchen = device("Kitchen", "G09");
        let node = build_start_node("speak", &json!("Hi"), &kitchen, &[], "en-US")
            .expect("Failed to build speak node");

        assert_eq!(node["@type"], json!(OPERATION_NODE_TYPE));
        assert_eq!(node["type"], json!("Alexa.Speak"));
        let payload = &node["operationPayload"];
        assert_eq!(payload["textToSpeak"], json!("Hi"));
        assert_eq!(payload["deviceSerialNumber"], json!("G09"));
        assert_eq!(payload["deviceType"], json!("A32DOYMUN6DTXA"));
        assert_eq!(payload["customerId"], json!("A1CUSTOMER"));
        assert_eq!(payload["locale"], json!("en-US"));
    }

    #[test]
    fn test_unknown_command_rejected() {
        let kitchen = device("Kitchen", "G09");
        let err = build_start_node("fireTVDance", &json!(""), &kitchen, &[], "en-US")
            .expect_err("Unknown command should fail");
        assert!(matches!(err, AlexaError::UnknownCommand(name) if name == "fireTVDance"));
    }

    #[test]
    fn test_volume_accepts_number_and_numeric_string() {
        let kitchen = device("Kitchen", "G09");
        let node = build_start_node("volume", &json!(30), &kitchen, &[], "en-US").unwrap();
        assert_eq!(node["operationPayload"]["value"], json!(30));

        let node = build_start_node("volume", &json!("45"), &kitchen, &[], "en-US").unwrap();
        assert_eq!(node["operationPayload"]["value"], json!(45));

        let err = build_start_node("volume", &json!(150), &kitchen, &[], "en-US")
            .expect_err("Out-of-range volume should fail");
        assert!(matches!(err, AlexaError::InvalidRequest(_)));
    }

    #[test]
    fn test_text_command_carries_skill_id() {
        let kitchen = device("Kitchen", "G09");
        let node =
            build_start_node("textCommand", &json!("turn off the light"), &kitchen, &[], "en-US")
                .unwrap();
        assert_eq!(node["type"], json!("Alexa.TextCommand"));
        assert_eq!(node["operationPayload"]["skillId"], json!(TEXT_COMMAND_SKILL_ID));
        assert_eq!(node["operationPayload"]["text"], json!("turn off the light"));
    }

    #[test]
    fn test_curated_tts_validates_category() {
        let kitchen = device("Kitchen", "G09");
        let node = build_start_node("curatedtts", &json!("goodnight"), &kitchen, &[], "en-US")
            .expect("Valid category should build");
        assert!(node["operationPayload"]["cannedTtsStringId"]
            .as_str()
            .unwrap()
            .contains("curatedtts-category-goodnight"));

        let err = build_start_node("curatedtts", &json!("yodel"), &kitchen, &[], "en-US")
            .expect_err("Invalid category should fail");
        assert!(matches!(err, AlexaError::InvalidRequest(_)));
    }

    #[test]
    fn test_stop_all_targets_every_device() {
        let kitchen = device("Kitchen", "G09");
        let all = vec![kitchen.clone(), device("Hall", "G10")];
        let node = build_start_node("deviceStopAll", &Value::Null, &kitchen, &all, "en-US").unwrap();
        let devices = node["operationPayload"]["devices"].as_array().unwrap();
        assert_eq!(devices.len(), 2);

        let node = build_start_node("deviceStop", &Value::Null, &kitchen, &all, "en-US").unwrap();
        let devices = node["operationPayload"]["devices"].as_array().unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0]["deviceSerialNumber"], json!("G09"));
    }

    #[test]
    fn test_fire_tv_commands() {
        let tv = device("Living Room TV", "G30");
        let node = build_start_node("fireTVTurnOn", &Value::Null, &tv, &[], "en-US").unwrap();
        assert_eq!(node["type"], json!("Alexa.Operation.Power.TurnOn"));
        assert_eq!(node["operationPayload"]["deviceSerialNumber"], json!("G30"));

        let node = build_start_node("fireTVPauseVideo", &Value::Null, &tv, &[], "en-US").unwrap();
        assert_eq!(node["type"], json!("Alexa.Operation.Playback.Pause"));

        // The toggle variant follows the value
        let node = build_start_node("fireTVTurnOnOff", &json!(true), &tv, &[], "en-US").unwrap();
        assert_eq!(node["type"], json!("Alexa.Operation.Power.TurnOn"));
        let node = build_start_node("fireTVTurnOnOff", &json!(false), &tv, &[], "en-US").unwrap();
        assert_eq!(node["type"], json!("Alexa.Operation.Power.TurnOff"));
    }

    #[test]
    fn test_announcement_ssml_speak_types() {
        let kitchen = device("Kitchen", "G09");
        let node = build_start_node("announcement", &json!("dinner"), &kitchen, &[], "en-US").unwrap();
        assert_eq!(node["type"], json!("AlexaAnnouncement"));
        let content = &node["operationPayload"]["content"][0];
        assert_eq!(content["speak"]["type"], json!("text"));
        assert_eq!(content["speak"]["value"], json!("dinner"));

        let ssml = json!({"title": "Bell", "text": "<speak>ding</speak>"});
        let node = build_start_node("ssml", &ssml, &kitchen, &[], "en-US").unwrap();
        let content = &node["operationPayload"]["content"][0];
        assert_eq!(content["speak"]["type"], json!("ssml"));
        assert_eq!(content["display"]["title"], json!("Bell"));
    }

    #[test]
    fn test_preview_request_string_encodes_sequence() {
        let kitchen = device("Kitchen", "G09");
        let node = build_start_node("weather", &Value::Null, &kitchen, &[], "en-US").unwrap();
        let sequence = build_sequence(node);
        assert_eq!(sequence["@type"], json!(SEQUENCE_TYPE));

        let request = preview_request(&sequence).unwrap();
        assert_eq!(request["behaviorId"], json!("PREVIEW"));
        assert_eq!(request["status"], json!("ENABLED"));
        let sequence_json = request["sequenceJson"].as_str().expect("sequenceJson is a string");
        let decoded: Value = serde_json::from_str(sequence_json).unwrap();
        assert_eq!(decoded["startNode"]["type"], json!("Alexa.Weather.Play"));
    }
}
