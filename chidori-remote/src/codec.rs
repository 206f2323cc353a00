//! 事件编解码注册表（EventCodecs）
//!
//! 远端只传递事件名与 JSON 载荷；两端各自以相同的名称登记事件类型。
//! `with_primitives` 预置与基础载荷对应的名称：string / int / long / double / char / bool。
//!
use crate::error::{RemoteError, RemoteResult};
use chidori::{Event, EventRef};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::{TypeId, type_name};
use std::sync::Arc;

type DecodeFn = Arc<dyn Fn(Value) -> RemoteResult<EventRef> + Send + Sync>;
type EncodeFn = Arc<dyn Fn(&dyn Event) -> RemoteResult<Value> + Send + Sync>;

#[derive(Clone)]
struct Codec {
    name: String,
    encode: EncodeFn,
}

#[derive(Default)]
pub struct EventCodecs {
    decoders: DashMap<String, DecodeFn>,
    encoders: DashMap<TypeId, Codec>,
}

impl EventCodecs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_primitives() -> Self {
        let codecs = Self::new();
        codecs.insert::<String>("string");
        codecs.insert::<i32>("int");
        codecs.insert::<i64>("long");
        codecs.insert::<f64>("double");
        codecs.insert::<char>("char");
        codecs.insert::<bool>("bool");
        codecs
    }

    /// 登记事件类型；名称或类型已登记时失败
    pub fn register<T>(&self, name: impl Into<String>) -> RemoteResult<()>
    where
        T: Event + Serialize + DeserializeOwned,
    {
        let name = name.into();
        // 先占住类型槽位再登记名称，锁顺序固定为 encoders → decoders
        let type_slot = match self.encoders.entry(TypeId::of::<T>()) {
            Entry::Occupied(_) => {
                return Err(RemoteError::CodecAlreadyRegistered {
                    name: type_name::<T>().to_string(),
                });
            }
            Entry::Vacant(slot) => slot,
        };

        match self.decoders.entry(name.clone()) {
            Entry::Occupied(_) => return Err(RemoteError::CodecAlreadyRegistered { name }),
            Entry::Vacant(slot) => {
                slot.insert(decoder::<T>());
            }
        }
        type_slot.insert(encoder::<T>(name));
        Ok(())
    }

    /// 编码具体类型的事件，返回 `(事件名, 载荷)`
    pub fn encode<T: Event + Serialize>(&self, event: &T) -> RemoteResult<(String, Value)> {
        let name = self
            .encoders
            .get(&TypeId::of::<T>())
            .map(|codec| codec.name.clone())
            .ok_or_else(|| RemoteError::UnknownEventType {
                name: type_name::<T>().to_string(),
            })?;
        Ok((name, serde_json::to_value(event)?))
    }

    /// 编码类型擦除的事件
    pub fn encode_ref(&self, event: &EventRef) -> RemoteResult<(String, Value)> {
        let event_type = event.event_type();
        let codec = self
            .encoders
            .get(&event_type.id())
            .map(|codec| codec.clone())
            .ok_or_else(|| RemoteError::UnknownEventType {
                name: event_type.name().to_string(),
            })?;
        Ok((codec.name, (codec.encode)(event.as_ref())?))
    }

    pub fn decode(&self, name: &str, payload: Value) -> RemoteResult<EventRef> {
        let decode = self
            .decoders
            .get(name)
            .map(|d| d.clone())
            .ok_or_else(|| RemoteError::UnknownEventType {
                name: name.to_string(),
            })?;
        decode(payload)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.decoders.contains_key(name)
    }

    // 仅用于全新注册表的预置项
    fn insert<T>(&self, name: &str)
    where
        T: Event + Serialize + DeserializeOwned,
    {
        self.decoders.insert(name.to_string(), decoder::<T>());
        self.encoders
            .insert(TypeId::of::<T>(), encoder::<T>(name.to_string()));
    }
}

fn decoder<T>() -> DecodeFn
where
    T: Event + DeserializeOwned,
{
    Arc::new(|payload: Value| -> RemoteResult<EventRef> {
        let event: T = serde_json::from_value(payload)?;
        Ok(Arc::new(event) as EventRef)
    })
}

fn encoder<T>(name: String) -> Codec
where
    T: Event + Serialize,
{
    Codec {
        name,
        encode: Arc::new(|event: &dyn Event| -> RemoteResult<Value> {
            let typed = event
                .downcast_ref::<T>()
                .ok_or_else(|| RemoteError::TypeMismatch {
                    expected: type_name::<T>(),
                    found: event.event_type().name(),
                })?;
            Ok(serde_json::to_value(typed)?)
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn primitives_use_wire_names() {
        let codecs = EventCodecs::with_primitives();

        assert_eq!(codecs.encode(&42_i64).unwrap(), ("long".to_string(), json!(42)));
        assert_eq!(
            codecs.encode(&"hi".to_string()).unwrap(),
            ("string".to_string(), json!("hi"))
        );

        let decoded = codecs.decode("char", json!("z")).unwrap();
        assert_eq!(decoded.downcast_ref::<char>(), Some(&'z'));
    }

    #[test]
    fn unknown_names_and_types_are_reported() {
        let codecs = EventCodecs::with_primitives();

        assert!(matches!(
            codecs.decode("float", json!(1.0)),
            Err(RemoteError::UnknownEventType { .. })
        ));
        assert!(matches!(
            codecs.encode(&1_u32),
            Err(RemoteError::UnknownEventType { .. })
        ));
    }

    #[test]
    fn registration_is_unique_by_name_and_type() {
        let codecs = EventCodecs::new();
        codecs.register::<u32>("count").unwrap();

        assert!(matches!(
            codecs.register::<u64>("count"),
            Err(RemoteError::CodecAlreadyRegistered { .. })
        ));
        assert!(matches!(
            codecs.register::<u32>("other"),
            Err(RemoteError::CodecAlreadyRegistered { .. })
        ));
        assert!(!codecs.contains("other"));
    }

    #[test]
    fn concurrent_registration_of_one_type_keeps_a_single_name() {
        let codecs = EventCodecs::new();

        let accepted: Vec<String> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|i| {
                    let codecs = &codecs;
                    scope.spawn(move || {
                        let name = format!("count-{i}");
                        codecs.register::<u64>(name.clone()).ok().map(|_| name)
                    })
                })
                .collect();
            workers
                .into_iter()
                .filter_map(|w| w.join().unwrap())
                .collect()
        });

        assert_eq!(accepted.len(), 1);
        let registered = (0..8).filter(|i| codecs.contains(&format!("count-{i}"))).count();
        assert_eq!(registered, 1);
        assert_eq!(codecs.encode(&5_u64).unwrap().0, accepted[0]);
    }

    #[test]
    fn type_erased_events_encode_by_runtime_type() {
        let codecs = EventCodecs::with_primitives();
        let event: EventRef = Arc::new(true);

        assert_eq!(codecs.encode_ref(&event).unwrap(), ("bool".to_string(), json!(true)));
    }

    #[test]
    fn malformed_payload_is_a_serde_error() {
        let codecs = EventCodecs::with_primitives();
        assert!(matches!(
            codecs.decode("int", json!("not a number")),
            Err(RemoteError::Serde(_))
        ));
    }
}
