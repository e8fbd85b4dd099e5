//! The fixed registration record and the per-connection registry of
//! dynamically declared device commands.

use std::collections::HashMap;

use uuid::Uuid;

use crate::codec::{decode_record, Field, FieldType, Schema, Value};
use crate::error::{Error, Result};

/// One piece of equipment attached to a device, as declared at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquipmentInfo {
    pub name: String,
    pub code: String,
    pub equipment_type: String,
}

/// One parameter of a declared notification or command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDecl {
    pub type_tag: u8,
    pub name: String,
}

/// A notification or command declaration: the intent a frame will carry and
/// the ordered parameter list describing its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDecl {
    pub intent: u16,
    pub name: String,
    pub parameters: Vec<ParamDecl>,
}

/// The decoded contents of a device's registration frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRegistration {
    pub device_id: Uuid,
    pub device_key: String,
    pub device_name: String,
    pub device_class_name: String,
    pub device_class_version: String,
    pub equipment: Vec<EquipmentInfo>,
    pub notifications: Vec<MessageDecl>,
    pub commands: Vec<MessageDecl>,
}

/// The fixed schema every registration frame's payload is decoded against.
pub fn registration_schema() -> Schema {
    let param_schema = Schema::new(vec![
        Field::new("type", FieldType::Byte),
        Field::new("name", FieldType::String),
    ]);
    let message_schema = Schema::new(vec![
        Field::new("intent", FieldType::Word),
        Field::new("name", FieldType::String),
        Field::new(
            "parameters",
            FieldType::Array(Box::new(FieldType::Record(param_schema))),
        ),
    ]);
    let equipment_schema = Schema::new(vec![
        Field::new("name", FieldType::String),
        Field::new("code", FieldType::String),
        Field::new("type", FieldType::String),
    ]);

    Schema::new(vec![
        Field::new("device_id", FieldType::Guid),
        Field::new("device_key", FieldType::String),
        Field::new("device_name", FieldType::String),
        Field::new("device_class_name", FieldType::String),
        Field::new("device_class_version", FieldType::String),
        Field::new(
            "equipment",
            FieldType::Array(Box::new(FieldType::Record(equipment_schema))),
        ),
        Field::new(
            "notifications",
            FieldType::Array(Box::new(FieldType::Record(message_schema.clone()))),
        ),
        Field::new(
            "commands",
            FieldType::Array(Box::new(FieldType::Record(message_schema))),
        ),
    ])
}

fn expect_string(fields: &HashMap<String, Value>, key: &str) -> Result<String> {
    match fields.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        _ => Err(Error::DeserializationError),
    }
}

fn expect_guid(fields: &HashMap<String, Value>, key: &str) -> Result<Uuid> {
    match fields.get(key) {
        Some(Value::Guid(g)) => Ok(*g),
        _ => Err(Error::DeserializationError),
    }
}

fn expect_word(fields: &HashMap<String, Value>, key: &str) -> Result<u16> {
    match fields.get(key) {
        Some(Value::Word(w)) => Ok(*w),
        _ => Err(Error::DeserializationError),
    }
}

fn expect_byte(fields: &HashMap<String, Value>, key: &str) -> Result<u8> {
    match fields.get(key) {
        Some(Value::Byte(b)) => Ok(*b),
        _ => Err(Error::DeserializationError),
    }
}

fn expect_array(fields: &HashMap<String, Value>, key: &str) -> Result<Vec<Value>> {
    match fields.get(key) {
        Some(Value::Array(items)) => Ok(items.clone()),
        _ => Err(Error::DeserializationError),
    }
}

fn expect_record(value: &Value) -> Result<&HashMap<String, Value>> {
    match value {
        Value::Record(fields) => Ok(fields),
        _ => Err(Error::DeserializationError),
    }
}

fn parse_equipment(value: &Value) -> Result<EquipmentInfo> {
    let fields = expect_record(value)?;
    Ok(EquipmentInfo {
        name: expect_string(fields, "name")?,
        code: expect_string(fields, "code")?,
        equipment_type: expect_string(fields, "type")?,
    })
}

fn parse_param(value: &Value) -> Result<ParamDecl> {
    let fields = expect_record(value)?;
    Ok(ParamDecl {
        type_tag: expect_byte(fields, "type")?,
        name: expect_string(fields, "name")?,
    })
}

fn parse_message(value: &Value) -> Result<MessageDecl> {
    let fields = expect_record(value)?;
    let parameters = expect_array(fields, "parameters")?
        .iter()
        .map(parse_param)
        .collect::<Result<Vec<_>>>()?;
    Ok(MessageDecl {
        intent: expect_word(fields, "intent")?,
        name: expect_string(fields, "name")?,
        parameters,
    })
}

/// Decodes a registration frame's payload into a [`DeviceRegistration`].
pub fn decode_device_registration(payload: &[u8]) -> Result<DeviceRegistration> {
    let (fields, _) = decode_record(payload, &registration_schema())?;

    let equipment = expect_array(&fields, "equipment")?
        .iter()
        .map(parse_equipment)
        .collect::<Result<Vec<_>>>()?;
    let notifications = expect_array(&fields, "notifications")?
        .iter()
        .map(parse_message)
        .collect::<Result<Vec<_>>>()?;
    let commands = expect_array(&fields, "commands")?
        .iter()
        .map(parse_message)
        .collect::<Result<Vec<_>>>()?;

    Ok(DeviceRegistration {
        device_id: expect_guid(&fields, "device_id")?,
        device_key: expect_string(&fields, "device_key")?,
        device_name: expect_string(&fields, "device_name")?,
        device_class_name: expect_string(&fields, "device_class_name")?,
        device_class_version: expect_string(&fields, "device_class_version")?,
        equipment,
        notifications,
        commands,
    })
}

/// Per-connection mapping from command name to synthesized schema, and from
/// intent to command name.
///
/// Populated once, by the registration handler, from the device's declared
/// commands. A mapping is never replaced once inserted: a device that
/// declares the same command name twice has its second declaration ignored.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas_by_name: HashMap<String, Schema>,
    names_by_intent: HashMap<u16, String>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synthesizes and registers a schema for every declared command.
    ///
    /// Fails the whole registration with [`Error::UnsupportedSchema`] if any
    /// command declares a nested array (an `Array` type tag) or an
    /// unrecognized type tag among its parameters.
    pub fn register_commands(&mut self, commands: &[MessageDecl]) -> Result<()> {
        for command in commands {
            if self.schemas_by_name.contains_key(&command.name) {
                continue;
            }

            let mut fields = Vec::with_capacity(command.parameters.len());
            for param in &command.parameters {
                let field_type =
                    FieldType::from_tag(param.type_tag).ok_or(Error::UnsupportedSchema)?;
                fields.push(Field::new(param.name.clone(), field_type));
            }

            self.names_by_intent
                .entry(command.intent)
                .or_insert_with(|| command.name.clone());
            self.schemas_by_name
                .insert(command.name.clone(), Schema::new(fields));
        }
        Ok(())
    }

    /// Looks up the command name registered for `intent`, if any.
    pub fn name_for_intent(&self, intent: u16) -> Option<&str> {
        self.names_by_intent.get(&intent).map(String::as_str)
    }

    /// Decodes a command frame's payload against its registered schema.
    ///
    /// Returns `Ok(None)` if no command is registered for `intent` — the
    /// caller should treat this as an unknown-intent delivery, never fatal.
    pub fn decode_command(
        &self,
        intent: u16,
        payload: &[u8],
    ) -> Result<Option<(String, HashMap<String, Value>)>> {
        let Some(name) = self.name_for_intent(intent) else {
            return Ok(None);
        };
        let schema = self
            .schemas_by_name
            .get(name)
            .expect("name_for_intent only returns registered names");
        let (fields, _) = decode_record(payload, schema)?;
        Ok(Some((name.to_string(), fields)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{encode_record, Value};
    use std::str::FromStr;

    fn sample_registration_fields() -> HashMap<String, Value> {
        let mut fields = HashMap::new();
        fields.insert(
            "device_id".to_string(),
            Value::Guid(Uuid::from_str("fa8a9d6e-6555-11e2-89b8-e0cb4eb92129").unwrap()),
        );
        fields.insert("device_key".to_string(), Value::String("key".to_string()));
        fields.insert(
            "device_name".to_string(),
            Value::String("thermostat".to_string()),
        );
        fields.insert(
            "device_class_name".to_string(),
            Value::String("Thermostat".to_string()),
        );
        fields.insert(
            "device_class_version".to_string(),
            Value::String("1.0".to_string()),
        );
        fields.insert("equipment".to_string(), Value::Array(vec![]));
        fields.insert("notifications".to_string(), Value::Array(vec![]));

        let mut param = HashMap::new();
        param.insert("type".to_string(), Value::Byte(2));
        param.insert("name".to_string(), Value::String("p1".to_string()));
        let mut param2 = HashMap::new();
        param2.insert("type".to_string(), Value::Byte(1));
        param2.insert("name".to_string(), Value::String("p2".to_string()));

        let mut command = HashMap::new();
        command.insert("intent".to_string(), Value::Word(100));
        command.insert("name".to_string(), Value::String("Ping".to_string()));
        command.insert(
            "parameters".to_string(),
            Value::Array(vec![Value::Record(param), Value::Record(param2)]),
        );

        fields.insert(
            "commands".to_string(),
            Value::Array(vec![Value::Record(command)]),
        );
        fields
    }

    #[test]
    fn s6_decodes_registration_and_dynamic_command() {
        let fields = sample_registration_fields();
        let mut payload = Vec::new();
        encode_record(&fields, &registration_schema(), &mut payload).unwrap();

        let registration = decode_device_registration(&payload).unwrap();
        assert_eq!(registration.device_name, "thermostat");
        assert_eq!(registration.commands.len(), 1);
        assert_eq!(registration.commands[0].name, "Ping");

        let mut registry = SchemaRegistry::new();
        registry.register_commands(&registration.commands).unwrap();

        let (name, params) = registry
            .decode_command(100, &[0xCD, 0xAB, 0xFF])
            .unwrap()
            .unwrap();
        assert_eq!(name, "Ping");
        assert_eq!(params.get("p1"), Some(&Value::Word(0xABCD)));
        assert_eq!(params.get("p2"), Some(&Value::Byte(0xFF)));
    }

    #[test]
    fn unknown_intent_decodes_to_none() {
        let registry = SchemaRegistry::new();
        assert_eq!(registry.decode_command(999, &[]).unwrap(), None);
    }

    #[test]
    fn nested_array_parameter_is_unsupported() {
        let mut registry = SchemaRegistry::new();
        let commands = vec![MessageDecl {
            intent: 1,
            name: "Bad".to_string(),
            parameters: vec![ParamDecl {
                type_tag: 15,
                name: "arr".to_string(),
            }],
        }];
        assert_eq!(
            registry.register_commands(&commands),
            Err(Error::UnsupportedSchema)
        );
    }

    #[test]
    fn duplicate_command_name_is_ignored() {
        let mut registry = SchemaRegistry::new();
        let first = vec![MessageDecl {
            intent: 1,
            name: "Ping".to_string(),
            parameters: vec![ParamDecl {
                type_tag: 2,
                name: "p1".to_string(),
            }],
        }];
        let second = vec![MessageDecl {
            intent: 2,
            name: "Ping".to_string(),
            parameters: vec![],
        }];
        registry.register_commands(&first).unwrap();
        registry.register_commands(&second).unwrap();

        assert_eq!(registry.name_for_intent(1), Some("Ping"));
        assert_eq!(registry.name_for_intent(2), None);
    }
}
