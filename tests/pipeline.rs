//! End-to-end decode/encode through the public API

use proptest::prelude::*;

use crmonban_codecs::codecs::root::ETH_API;
use crmonban_codecs::protocols::eth::{ETHERTYPE_8021Q, ETHERTYPE_IPV4, ETH_HDR_LEN};
use crmonban_codecs::{
    CaptureInfo, Codec, CodecApi, CodecEvent, CodecManager, Config, DecodeFailure, DecodeStop,
    Decoded, EncodeFlags, EtherHdr, MacAddr, Packet, PacketManager, ProtoBits, ProtocolId,
    CODEC_API_VERSION, DLT_EN10MB,
};

/// 802.1Q tag: TCI then the inner ethertype
struct VlanCodec;

impl Codec for VlanCodec {
    fn name(&self) -> &'static str {
        "vlan"
    }

    fn proto_bits(&self) -> ProtoBits {
        ProtoBits::VLAN
    }

    fn protocol_ids(&self) -> &'static [ProtocolId] {
        &[ETHERTYPE_8021Q]
    }

    fn decode(&self, raw: &[u8], _p: &mut Packet<'_>) -> Result<Decoded, DecodeFailure> {
        if raw.len() < 4 {
            return Err(DecodeFailure::Truncated {
                needed: 4,
                available: raw.len(),
            });
        }
        Ok(Decoded::new(4, u16::from_be_bytes([raw[2], raw[3]])))
    }
}

const VLAN_API: CodecApi = CodecApi {
    name: "vlan",
    api_version: CODEC_API_VERSION,
    mod_ctor: None,
    ctor: |_| Box::new(VlanCodec),
};

fn vlan_manager(config: &Config) -> PacketManager {
    PacketManager::new(CodecManager::new(&[ETH_API, VLAN_API]).unwrap(), config)
}

fn frame(dst: [u8; 6], src: [u8; 6], ether_type: u16, rest: &[u8]) -> Vec<u8> {
    let mut raw = Vec::with_capacity(ETH_HDR_LEN + rest.len());
    raw.extend_from_slice(&dst);
    raw.extend_from_slice(&src);
    raw.extend_from_slice(&ether_type.to_be_bytes());
    raw.extend_from_slice(rest);
    raw
}

fn info(raw: &[u8]) -> CaptureInfo {
    CaptureInfo::new(DLT_EN10MB, raw.len() as u32)
}

#[test]
fn test_stacked_vlans() {
    let pm = vlan_manager(&Config::default());
    let mut rest = vec![0x00, 0x0a, 0x81, 0x00, 0x00, 0x14, 0x08, 0x00];
    rest.extend_from_slice(&[0x45, 0x00, 0x00, 0x14]);
    let raw = frame([1; 6], [2; 6], ETHERTYPE_8021Q, &rest);

    let p = pm.decode(&raw, info(&raw));
    assert_eq!(p.num_layers(), 3);
    assert!(p.has(ProtoBits::ETH | ProtoBits::VLAN));
    assert_eq!(p.decoded_len(), ETH_HDR_LEN + 8);
    assert_eq!(p.next_protocol(), Some(ETHERTYPE_IPV4));
    assert_eq!(p.stop_reason(), DecodeStop::UnknownProtocol(ETHERTYPE_IPV4));
    assert_eq!(p.payload(), &[0x45, 0x00, 0x00, 0x14]);

    let names: Vec<_> = p
        .layers()
        .iter()
        .map(|l| pm.codecs().name(l.codec).unwrap())
        .collect();
    assert_eq!(names, ["eth", "vlan", "vlan"]);

    let stats = pm.stats();
    assert_eq!(stats.layers.get("vlan"), Some(&2));
    assert_eq!(stats.layers.get("eth"), Some(&1));
}

#[test]
fn test_reverse_response_keeps_inner_layers() {
    let pm = vlan_manager(&Config::default());
    let raw = frame([1; 6], [2; 6], ETHERTYPE_8021Q, &[0x00, 0x0a, 0x08, 0x00]);
    let p = pm.decode(&raw, info(&raw));

    let out = pm.encode(&p, EncodeFlags::reverse(), b"x").unwrap();
    let data = out.data();
    assert_eq!(data.len(), ETH_HDR_LEN + 4 + 1);

    let eh = EtherHdr::parse(data).unwrap();
    assert_eq!(eh.ether_dst, MacAddr::new([2; 6]));
    assert_eq!(eh.ether_src, MacAddr::new([1; 6]));
    assert_eq!(eh.ether_type, ETHERTYPE_8021Q);
    assert_eq!(&data[ETH_HDR_LEN..], &[0x00, 0x0a, 0x08, 0x00, b'x']);
}

#[test]
fn test_owned_clone_outlives_capture_buffer() {
    let pm = PacketManager::with_config(&Config::default()).unwrap();
    let owned = {
        let raw = frame([1; 6], [2; 6], ETHERTYPE_IPV4, &[0x45]);
        pm.decode(&raw, info(&raw)).into_owned()
    };
    assert_eq!(owned.num_layers(), 1);
    assert_eq!(owned.payload(), &[0x45]);

    let out = pm.encode(&owned, EncodeFlags::forward(), &[]).unwrap();
    assert_eq!(EtherHdr::parse(out.data()).unwrap().ether_type, ETHERTYPE_IPV4);
}

#[test]
fn test_shared_between_threads() {
    let pm = vlan_manager(&Config::default());
    let raw = frame([1; 6], [2; 6], ETHERTYPE_8021Q, &[0x00, 0x0a, 0x08, 0x00]);

    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..100 {
                    let p = pm.decode(&raw, info(&raw));
                    assert_eq!(p.num_layers(), 2);
                }
            });
        }
    });

    assert_eq!(pm.stats().packets, 400);
    assert_eq!(pm.stats().layers.get("vlan"), Some(&400));
}

#[test]
fn test_config_drives_manager() {
    let config = Config::from_str(
        r#"
        [decode]
        max_layers = 2

        [encode]
        dst_mac = "02:00:00:00:00:01"
        "#,
    )
    .unwrap();
    let pm = vlan_manager(&config);
    assert_eq!(pm.max_layers(), 2);

    let raw = frame(
        [1; 6],
        [2; 6],
        ETHERTYPE_8021Q,
        &[0, 1, 0x81, 0x00, 0, 2, 0x81, 0x00, 0, 3, 0x08, 0x00],
    );
    let p = pm.decode(&raw, info(&raw));
    assert_eq!(p.num_layers(), 2);
    assert_eq!(p.stop_reason(), DecodeStop::DepthExceeded);
    assert_eq!(p.events()[0].kind, CodecEvent::TooManyLayers);

    let out = pm.encode(&p, EncodeFlags::forward(), &[]).unwrap();
    assert_eq!(
        EtherHdr::parse(out.data()).unwrap().ether_dst,
        "02:00:00:00:00:01".parse::<MacAddr>().unwrap()
    );
}

#[test]
fn test_smallest_valid_buffer_encodes_link_header() {
    assert!(Config::from_str("[encode]\nbuffer_size = 15\n").is_err());

    let config = Config::from_str("[encode]\nbuffer_size = 16\n").unwrap();
    let pm = PacketManager::with_config(&config).unwrap();
    let raw = frame([1; 6], [2; 6], ETHERTYPE_IPV4, &[]);
    let p = pm.decode(&raw, info(&raw));

    for flags in [EncodeFlags::forward(), EncodeFlags::reverse()] {
        let out = pm.encode(&p, flags, &[]).unwrap();
        assert_eq!(out.len(), ETH_HDR_LEN);
        assert_eq!(out.pad(), 2);
    }
}

proptest! {
    #[test]
    fn prop_short_frames_raise_one_event(
        raw in proptest::collection::vec(any::<u8>(), 0..ETH_HDR_LEN),
    ) {
        let pm = PacketManager::with_config(&Config::default()).unwrap();
        let p = pm.decode(&raw, info(&raw));

        prop_assert_eq!(p.num_layers(), 0);
        prop_assert_eq!(p.events().len(), 1);
        prop_assert_eq!(p.events()[0].kind, CodecEvent::EthHdrTrunc);
        prop_assert_eq!(p.payload(), &raw[..]);
    }

    #[test]
    fn prop_layers_tile_the_frame(
        raw in proptest::collection::vec(any::<u8>(), 0..256),
        max_layers in 1u8..16,
    ) {
        let mut config = Config::default();
        config.decode.max_layers = max_layers;
        let pm = vlan_manager(&config);
        let p = pm.decode(&raw, info(&raw));

        prop_assert!(p.num_layers() <= usize::from(max_layers));
        let mut offset = 0;
        for layer in p.layers() {
            prop_assert_eq!(layer.start, offset);
            offset = layer.end();
        }
        prop_assert!(offset <= raw.len());
        prop_assert_eq!(p.decoded_len(), offset);
        prop_assert_eq!(p.payload(), &raw[offset..]);
    }

    #[test]
    fn prop_forward_encode_reproduces_header(
        dst in any::<[u8; 6]>(),
        src in any::<[u8; 6]>(),
        ether_type in 1501u16..=u16::MAX,
        rest in proptest::collection::vec(any::<u8>(), 0..64),
    ) {
        let pm = PacketManager::with_config(&Config::default()).unwrap();
        let raw = frame(dst, src, ether_type, &rest);
        let p = pm.decode(&raw, info(&raw));
        prop_assert_eq!(p.num_layers(), 1);

        let out = pm.encode(&p, EncodeFlags::forward(), p.payload()).unwrap();
        prop_assert_eq!(out.data(), &raw[..]);
    }

    #[test]
    fn prop_reverse_swaps_unless_overridden(
        dst in any::<[u8; 6]>(),
        src in any::<[u8; 6]>(),
        gw in proptest::option::of(any::<[u8; 6]>()),
    ) {
        let mut config = Config::default();
        config.encode.dst_mac = gw.map(MacAddr::new);
        let pm = PacketManager::with_config(&config).unwrap();
        let raw = frame(dst, src, ETHERTYPE_IPV4, &[]);
        let p = pm.decode(&raw, info(&raw));

        let out = pm.encode(&p, EncodeFlags::reverse(), &[]).unwrap();
        let eh = EtherHdr::parse(out.data()).unwrap();
        prop_assert_eq!(eh.ether_src, MacAddr::new(dst));
        prop_assert_eq!(eh.ether_dst, MacAddr::new(gw.unwrap_or(src)));
        prop_assert_eq!(eh.ether_type, ETHERTYPE_IPV4);
    }
}
