//! Property-Based Tests for EPS NAS
//!
//! These tests verify that protected EMM messages survive an encode and
//! decode with the same security context, and the NAS COUNT arithmetic.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use bytes::BytesMut;

    use crate::common::types::*;
    use crate::eps::*;

    fn arb_plmn_id() -> impl Strategy<Value = PlmnId> {
        (
            prop::array::uniform3(0u8..10),
            prop::array::uniform3(0u8..10),
            2u8..4,
        ).prop_map(|(mcc, mut mnc, mnc_len)| {
            if mnc_len == 2 {
                mnc[2] = 0;
            }
            PlmnId::new(mcc, mnc, mnc_len)
        })
    }

    fn arb_guti() -> impl Strategy<Value = EpsGuti> {
        (arb_plmn_id(), any::<u16>(), any::<u8>(), any::<u32>()).prop_map(
            |(plmn_id, mme_gid, mme_code, m_tmsi)| EpsGuti { plmn_id, mme_gid, mme_code, m_tmsi },
        )
    }

    fn arb_emm_message() -> impl Strategy<Value = EmmMessage> {
        prop_oneof![
            any::<u8>().prop_map(|cause| EmmMessage::EmmStatus(EmmStatus { emm_cause: EmmCause::from(cause) })),
            (1u8..4).prop_map(|identity_type| EmmMessage::IdentityRequest(IdentityRequest { identity_type })),
            Just(EmmMessage::DetachAccept),
            (any::<[u8; 16]>(), any::<[u8; 16]>(), 0u8..7).prop_map(|(rand, autn, ksi)| {
                EmmMessage::AuthenticationRequest(AuthenticationRequest {
                    nas_key_set_identifier: KeySetIdentifier::new(0, ksi),
                    rand,
                    autn,
                })
            }),
            (arb_plmn_id(), prop::collection::vec(any::<u16>(), 1..16), arb_guti()).prop_map(
                |(plmn_id, tacs, guti)| {
                    EmmMessage::AttachAccept(AttachAccept {
                        tai_list: EpsTaiList { plmn_id, tacs },
                        esm_message_container: EsmMessageContainer::new(vec![0x52, 0x01, 0xc1]),
                        guti: Some(guti),
                        ..Default::default()
                    })
                }
            ),
        ]
    }

    fn arb_protected_header_type() -> impl Strategy<Value = SecurityHeaderType> {
        prop::sample::select(vec![
            SecurityHeaderType::IntegrityProtected,
            SecurityHeaderType::IntegrityProtectedAndCiphered,
            SecurityHeaderType::IntegrityProtectedWithNewEpsSecurityContext,
            SecurityHeaderType::IntegrityProtectedAndCipheredWithNewEpsSecurityContext,
        ])
    }

    fn arb_context() -> impl Strategy<Value = EmmSecurityContext> {
        (
            any::<[u8; 16]>(),
            any::<[u8; 16]>(),
            prop::sample::select(vec![SecurityAlgorithms::EEA0, SecurityAlgorithms::EEA2]),
            prop::sample::select(vec![SecurityAlgorithms::EIA0, SecurityAlgorithms::EIA2]),
            any::<u16>(),
            any::<u8>(),
        ).prop_map(|(knas_int, knas_enc, ciphering, integrity, overflow, seq_num)| {
            let mut ctx = EmmSecurityContext::native(
                0,
                knas_int,
                knas_enc,
                SecurityAlgorithms::new(ciphering, integrity),
            );
            ctx.dl_count = NasCount::new(overflow, seq_num);
            ctx.activated = 1;
            ctx
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_protected_round_trip(
            msg in arb_emm_message(),
            sht in arb_protected_header_type(),
            ctx in arb_context(),
        ) {
            let header = NasSecurityHeader::new(sht, ctx.dl_count.seq_num);
            let nas = NasMessage::with_header(header, msg.clone());

            let mut out = Vec::new();
            let len = nas_message_encode(&nas, &mut out, 512, Some(&ctx), NasDirection::Downlink).unwrap();
            prop_assert_eq!(len, out.len());
            prop_assert_eq!(out[5], ctx.dl_count.seq_num);

            let (decoded, status) = nas_message_decode(&out, Some(&ctx), NasDirection::Downlink).unwrap();
            prop_assert!(status.mac_matched);
            prop_assert!(status.integrity_protected_message);
            prop_assert_eq!(status.ciphered_message, sht.is_ciphered());
            prop_assert_eq!(decoded.header.sequence_number, ctx.dl_count.seq_num);
            prop_assert_eq!(decoded.emm(), &msg);
        }

        #[test]
        fn prop_tampered_payload_fails_mac(
            msg in arb_emm_message(),
            ctx in arb_context(),
            flip in 1u8..=255,
        ) {
            prop_assume!(ctx.selected_algorithms.integrity == SecurityAlgorithms::EIA2);
            let nas = NasMessage::with_header(
                NasSecurityHeader::new(SecurityHeaderType::IntegrityProtected, ctx.dl_count.seq_num),
                msg,
            );
            let mut out = Vec::new();
            nas_message_encode(&nas, &mut out, 512, Some(&ctx), NasDirection::Downlink).unwrap();
            let last = out.len() - 1;
            out[last] ^= flip;

            let decrypted = nas_message_decrypt(&out, Some(&ctx), NasDirection::Downlink).unwrap();
            prop_assert!(!decrypted.status.mac_matched);
        }

        #[test]
        fn prop_count_packing(overflow in any::<u16>(), seq_num in any::<u8>()) {
            let count = NasCount::new(overflow, seq_num);
            prop_assert_eq!(count.value() >> 8, overflow as u32);
            prop_assert_eq!(count.value() & 0xff, seq_num as u32);
            prop_assert!(count.value() < 1 << 24);
        }

        #[test]
        fn prop_count_estimate_never_mutates(
            overflow in 0u16..u16::MAX,
            stored in any::<u8>(),
            received in any::<u8>(),
        ) {
            let count = NasCount::new(overflow, stored);
            let estimated = count.estimate(received);
            prop_assert_eq!(count, NasCount::new(overflow, stored));
            prop_assert_eq!(estimated.seq_num, received);
            prop_assert!(estimated.value() >= count.value() || received < stored);
        }

        #[test]
        fn prop_guti_round_trip(guti in arb_guti()) {
            let identity = EpsMobileIdentity::Guti(guti);
            let mut buf = BytesMut::new();
            identity.encode(&mut buf);
            let decoded = EpsMobileIdentity::decode(&mut buf.freeze()).unwrap();
            prop_assert_eq!(decoded, identity);
        }
    }
}
