//! Codec registry
//!
//! Built once at startup from a table of [`CodecApi`] entries. Maps capture
//! link types to root codecs and protocol ids to inner codecs. Both maps
//! have unique keys; a clash is a startup error. Nothing here changes after
//! construction, so a registry can be shared freely between packet threads.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::codecs::{Codec, CodecApi, CodecId, CodecModule, ProtocolId, CODEC_API_VERSION};
use crate::error::{CodecError, Result};

/// Codec ids are stored per layer as a byte
pub const MAX_CODECS: usize = u8::MAX as usize + 1;

struct CodecEntry {
    name: &'static str,
    codec: Box<dyn Codec>,
    module: Option<Box<dyn CodecModule>>,
}

pub struct CodecManager {
    entries: Vec<CodecEntry>,
    by_name: HashMap<&'static str, CodecId>,
    by_dlt: HashMap<i32, CodecId>,
    by_proto: HashMap<ProtocolId, CodecId>,
}

impl CodecManager {
    /// Instantiate every codec in `apis` and index it
    pub fn new(apis: &[CodecApi]) -> Result<Self> {
        let mut mgr = Self {
            entries: Vec::with_capacity(apis.len()),
            by_name: HashMap::new(),
            by_dlt: HashMap::new(),
            by_proto: HashMap::new(),
        };

        for api in apis {
            mgr.register(api)?;
        }

        info!(
            "codec registry ready: {} codecs, {} link types, {} protocol ids",
            mgr.entries.len(),
            mgr.by_dlt.len(),
            mgr.by_proto.len()
        );
        Ok(mgr)
    }

    fn register(&mut self, api: &CodecApi) -> Result<()> {
        if api.api_version != CODEC_API_VERSION {
            return Err(CodecError::ApiVersion {
                name: api.name,
                expected: CODEC_API_VERSION,
                got: api.api_version,
            });
        }
        if self.by_name.contains_key(api.name) {
            return Err(CodecError::DuplicateCodec(api.name));
        }
        let index = u8::try_from(self.entries.len())
            .map_err(|_| CodecError::TooManyCodecs(MAX_CODECS))?;
        let id = CodecId::new(index);

        let module = api.mod_ctor.map(|mod_ctor| mod_ctor());
        let codec = (api.ctor)(module.as_deref());

        if codec.name() != api.name {
            warn!(
                "codec registered as {} reports name {}",
                api.name,
                codec.name()
            );
        }

        // check every key before touching the maps
        let dlts = codec.data_link_types();
        if let Some(i) = (1..dlts.len()).find(|&i| dlts[..i].contains(&dlts[i])) {
            return Err(CodecError::DuplicateDataLink {
                dlt: dlts[i],
                existing: api.name,
                codec: api.name,
            });
        }
        let protos = codec.protocol_ids();
        if let Some(i) = (1..protos.len()).find(|&i| protos[..i].contains(&protos[i])) {
            return Err(CodecError::DuplicateProtocolId {
                id: protos[i],
                existing: api.name,
                codec: api.name,
            });
        }

        for &dlt in dlts {
            if let Some(existing) = self.by_dlt.get(&dlt) {
                return Err(CodecError::DuplicateDataLink {
                    dlt,
                    existing: self.entries[existing.index()].name,
                    codec: api.name,
                });
            }
        }
        for &proto in protos {
            if let Some(existing) = self.by_proto.get(&proto) {
                return Err(CodecError::DuplicateProtocolId {
                    id: proto,
                    existing: self.entries[existing.index()].name,
                    codec: api.name,
                });
            }
        }

        for &dlt in codec.data_link_types() {
            self.by_dlt.insert(dlt, id);
        }
        for &proto in codec.protocol_ids() {
            self.by_proto.insert(proto, id);
        }
        self.by_name.insert(api.name, id);

        debug!(
            codec = api.name,
            dlts = ?codec.data_link_types(),
            protos = ?codec.protocol_ids(),
            "registered codec"
        );

        self.entries.push(CodecEntry {
            name: api.name,
            codec,
            module,
        });
        Ok(())
    }

    pub fn get(&self, id: CodecId) -> Option<&dyn Codec> {
        self.entries.get(id.index()).map(|e| e.codec.as_ref())
    }

    pub fn module(&self, id: CodecId) -> Option<&dyn CodecModule> {
        self.entries.get(id.index())?.module.as_deref()
    }

    /// Registered name of a codec
    pub fn name(&self, id: CodecId) -> Option<&'static str> {
        self.entries.get(id.index()).map(|e| e.name)
    }

    pub fn by_name(&self, name: &str) -> Option<CodecId> {
        self.by_name.get(name).copied()
    }

    /// Root codec for a capture link type
    pub fn root_for(&self, dlt: i32) -> Option<CodecId> {
        self.by_dlt.get(&dlt).copied()
    }

    /// Inner codec for a protocol id
    pub fn for_protocol(&self, proto: ProtocolId) -> Option<CodecId> {
        self.by_proto.get(&proto).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All codecs in registration order
    pub fn iter(&self) -> impl Iterator<Item = (CodecId, &dyn Codec)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (CodecId::new(i as u8), e.codec.as_ref()))
    }
}

impl std::fmt::Debug for CodecManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecManager")
            .field("codecs", &self.entries.iter().map(|e| e.name).collect::<Vec<_>>())
            .field("dlts", &self.by_dlt.keys().collect::<Vec<_>>())
            .field("protocols", &self.by_proto.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codecs::{DecodeFailure, Decoded, DEFAULT_CODECS};
    use crate::core::{Packet, DLT_EN10MB};

    struct Stub {
        name: &'static str,
        dlts: &'static [i32],
        protos: &'static [ProtocolId],
    }

    impl Codec for Stub {
        fn name(&self) -> &'static str {
            self.name
        }

        fn data_link_types(&self) -> &'static [i32] {
            self.dlts
        }

        fn protocol_ids(&self) -> &'static [ProtocolId] {
            self.protos
        }

        fn decode(
            &self,
            _raw: &[u8],
            _p: &mut Packet<'_>,
        ) -> std::result::Result<Decoded, DecodeFailure> {
            Err(DecodeFailure::Invalid)
        }
    }

    fn ipv4_stub() -> CodecApi {
        CodecApi {
            name: "ipv4",
            api_version: CODEC_API_VERSION,
            mod_ctor: None,
            ctor: |_| {
                Box::new(Stub {
                    name: "ipv4",
                    dlts: &[],
                    protos: &[0x0800],
                })
            },
        }
    }

    #[test]
    fn test_default_registry() {
        let mgr = CodecManager::new(&DEFAULT_CODECS).unwrap();
        assert_eq!(mgr.len(), 1);

        let eth = mgr.root_for(DLT_EN10MB).unwrap();
        assert_eq!(mgr.name(eth), Some("eth"));
        assert_eq!(mgr.by_name("eth"), Some(eth));
        assert!(mgr.module(eth).is_some());
        assert!(mgr.for_protocol(0x0800).is_none());
        assert!(mgr.root_for(113).is_none());
    }

    #[test]
    fn test_inner_codec_lookup() {
        let apis = [crate::codecs::root::ETH_API, ipv4_stub()];
        let mgr = CodecManager::new(&apis).unwrap();

        let ip = mgr.for_protocol(0x0800).unwrap();
        assert_eq!(mgr.get(ip).unwrap().name(), "ipv4");
        assert!(mgr.module(ip).is_none());
        assert_eq!(mgr.iter().count(), 2);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let apis = [ipv4_stub(), ipv4_stub()];
        assert!(matches!(
            CodecManager::new(&apis),
            Err(CodecError::DuplicateCodec("ipv4"))
        ));
    }

    #[test]
    fn test_duplicate_protocol_rejected() {
        let other = CodecApi {
            name: "ipv4-alt",
            api_version: CODEC_API_VERSION,
            mod_ctor: None,
            ctor: |_| {
                Box::new(Stub {
                    name: "ipv4-alt",
                    dlts: &[],
                    protos: &[0x0800],
                })
            },
        };
        let apis = [ipv4_stub(), other];
        match CodecManager::new(&apis) {
            Err(CodecError::DuplicateProtocolId { id, existing, codec }) => {
                assert_eq!(id, 0x0800);
                assert_eq!(existing, "ipv4");
                assert_eq!(codec, "ipv4-alt");
            }
            other => panic!("expected DuplicateProtocolId, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_duplicate_dlt_rejected() {
        let second_eth = CodecApi {
            name: "eth2",
            api_version: CODEC_API_VERSION,
            mod_ctor: None,
            ctor: |_| {
                Box::new(Stub {
                    name: "eth2",
                    dlts: &[DLT_EN10MB],
                    protos: &[],
                })
            },
        };
        let apis = [crate::codecs::root::ETH_API, second_eth];
        assert!(matches!(
            CodecManager::new(&apis),
            Err(CodecError::DuplicateDataLink { dlt: DLT_EN10MB, .. })
        ));
    }

    #[test]
    fn test_repeated_id_within_one_codec_rejected() {
        let repeats_proto = CodecApi {
            name: "vlan",
            api_version: CODEC_API_VERSION,
            mod_ctor: None,
            ctor: |_| {
                Box::new(Stub {
                    name: "vlan",
                    dlts: &[],
                    protos: &[0x8100, 0x88A8, 0x8100],
                })
            },
        };
        match CodecManager::new(&[repeats_proto]) {
            Err(CodecError::DuplicateProtocolId { id, existing, codec }) => {
                assert_eq!(id, 0x8100);
                assert_eq!(existing, "vlan");
                assert_eq!(codec, "vlan");
            }
            other => panic!("expected DuplicateProtocolId, got {:?}", other.map(|_| ())),
        }

        let repeats_dlt = CodecApi {
            name: "eth2",
            api_version: CODEC_API_VERSION,
            mod_ctor: None,
            ctor: |_| {
                Box::new(Stub {
                    name: "eth2",
                    dlts: &[DLT_EN10MB, DLT_EN10MB],
                    protos: &[],
                })
            },
        };
        assert!(matches!(
            CodecManager::new(&[repeats_dlt]),
            Err(CodecError::DuplicateDataLink { dlt: DLT_EN10MB, .. })
        ));
    }

    #[test]
    fn test_api_version_mismatch() {
        let mut api = ipv4_stub();
        api.api_version = CODEC_API_VERSION + 1;
        assert!(matches!(
            CodecManager::new(&[api]),
            Err(CodecError::ApiVersion { name: "ipv4", .. })
        ));
    }
}
