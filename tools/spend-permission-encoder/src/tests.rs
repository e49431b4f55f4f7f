use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{Eip712Domain, SolCall, SolStruct};
use k256::ecdsa::SigningKey;
use proptest::prelude::*;
use spend_permission_types::{
    PermissionError, SpendPermission, MAX_UINT160, MAX_UINT48, SPEND_PERMISSION_MANAGER,
    USDC_ADDRESS,
};

use crate::abi::{
    approve_with_signature_calldata, decode_allowance, spend_calldata, to_abi,
    ISpendPermissionManager,
};
use crate::encoder::{encode_type, permission_digest, EncodeError, SPEND_PERMISSION_TYPE};
use crate::signer::{address_of, recover_signer, sign_digest};
use crate::types::{PermissionDomain, TypedDataRequest};

fn sample() -> SpendPermission {
    SpendPermission {
        account: Address::repeat_byte(0x11),
        spender: Address::repeat_byte(0x22),
        token: USDC_ADDRESS,
        allowance: U256::from(10_000_000u64),
        period: 86_400,
        start: 1_700_000_000,
        end: 1_700_000_000 + 31_536_000,
        salt: U256::from(0xdead_beefu64),
        extra_data: Bytes::from_static(b"magic-spend"),
        hook: Address::ZERO,
        hook_config: Bytes::new(),
    }
}

fn domain() -> PermissionDomain {
    PermissionDomain::new(84_532, SPEND_PERMISSION_MANAGER)
}

#[test]
fn type_string_matches_field_table() {
    assert_eq!(encode_type(), SPEND_PERMISSION_TYPE);
}

#[test]
fn digest_matches_alloy_eip712_hash() {
    let permission = sample();
    let ours = permission_digest(&permission, &domain()).unwrap();

    let alloy_domain = Eip712Domain::new(
        Some("Spend Permission Manager".into()),
        Some("1".into()),
        Some(U256::from(84_532u64)),
        Some(SPEND_PERMISSION_MANAGER),
        None,
    );
    let theirs = to_abi(&permission).unwrap().eip712_signing_hash(&alloy_domain);
    assert_eq!(ours, theirs);
}

#[test]
fn every_field_changes_the_digest() {
    let base = permission_digest(&sample(), &domain()).unwrap();

    let mutations: Vec<(&str, Box<dyn Fn(&mut SpendPermission)>)> = vec![
        ("account", Box::new(|p: &mut SpendPermission| p.account = Address::repeat_byte(0x33))),
        ("spender", Box::new(|p: &mut SpendPermission| p.spender = Address::repeat_byte(0x33))),
        ("token", Box::new(|p: &mut SpendPermission| p.token = Address::repeat_byte(0x33))),
        ("allowance", Box::new(|p: &mut SpendPermission| p.allowance += U256::from(1u64))),
        ("period", Box::new(|p: &mut SpendPermission| p.period += 1)),
        ("start", Box::new(|p: &mut SpendPermission| p.start += 1)),
        ("end", Box::new(|p: &mut SpendPermission| p.end += 1)),
        ("salt", Box::new(|p: &mut SpendPermission| p.salt += U256::from(1u64))),
        ("extraData", Box::new(|p: &mut SpendPermission| p.extra_data = Bytes::from_static(b"subaccount"))),
        ("hook", Box::new(|p: &mut SpendPermission| p.hook = Address::repeat_byte(0x44))),
        ("hookConfig", Box::new(|p: &mut SpendPermission| p.hook_config = Bytes::from_static(&[1]))),
    ];
    for (field, mutate) in mutations {
        let mut permission = sample();
        mutate(&mut permission);
        let digest = permission_digest(&permission, &domain()).unwrap();
        assert_ne!(digest, base, "changing `{field}` did not change the digest");
    }

    let other_chain = PermissionDomain::new(8_453, SPEND_PERMISSION_MANAGER);
    assert_ne!(permission_digest(&sample(), &other_chain).unwrap(), base);
}

#[test]
fn oversized_integers_are_rejected() {
    let mut permission = sample();
    permission.allowance = MAX_UINT160 + U256::from(1u64);
    assert_eq!(
        permission_digest(&permission, &domain()),
        Err(EncodeError::Width(PermissionError::FieldOverflow {
            field: "allowance",
            bits: 160
        }))
    );

    for field in ["period", "start", "end"] {
        let mut permission = sample();
        match field {
            "period" => permission.period = MAX_UINT48 + 1,
            "start" => permission.start = MAX_UINT48 + 1,
            _ => permission.end = MAX_UINT48 + 1,
        }
        assert_eq!(
            permission_digest(&permission, &domain()),
            Err(EncodeError::Width(PermissionError::FieldOverflow { field, bits: 48 }))
        );
    }

    let mut at_limit = sample();
    at_limit.allowance = MAX_UINT160;
    at_limit.end = MAX_UINT48;
    assert!(permission_digest(&at_limit, &domain()).is_ok());
}

#[test]
fn signature_recovers_to_signer() {
    let key = SigningKey::from_slice(&[0x42u8; 32]).unwrap();
    let owner = address_of(key.verifying_key());

    let mut permission = sample();
    permission.account = owner;
    let digest = permission_digest(&permission, &domain()).unwrap();
    let signature = sign_digest(digest, &key).unwrap();

    assert_eq!(signature.len(), 65);
    assert!(signature[64] == 27 || signature[64] == 28);
    assert_eq!(recover_signer(digest, &signature).unwrap(), owner);

    permission.salt += U256::from(1u64);
    let other = permission_digest(&permission, &domain()).unwrap();
    assert_ne!(recover_signer(other, &signature).unwrap(), owner);
}

#[test]
fn approve_with_signature_calldata_round_trips_through_abi() {
    let permission = sample();
    let signature = Bytes::from(vec![7u8; 65]);
    let data = approve_with_signature_calldata(&permission, &signature).unwrap();

    assert_eq!(
        &data[..4],
        ISpendPermissionManager::approveWithSignatureCall::SELECTOR.as_slice()
    );
    let decoded = ISpendPermissionManager::approveWithSignatureCall::abi_decode(&data, true).unwrap();
    assert_eq!(decoded.spendPermission.account, permission.account);
    assert_eq!(decoded.spendPermission.salt, permission.salt);
    assert_eq!(decoded.signature, signature);
}

#[test]
fn spend_calldata_carries_value_and_hook_data() {
    let data = spend_calldata(&sample(), U256::from(1u64), &Bytes::new()).unwrap();
    let decoded = ISpendPermissionManager::spendCall::abi_decode(&data, true).unwrap();
    assert_eq!(decoded.value.to::<u64>(), 1);
    assert!(decoded.hookData.is_empty());

    assert!(spend_calldata(&sample(), MAX_UINT160 + U256::from(1u64), &Bytes::new()).is_err());
}

#[test]
fn allowance_return_is_decoded() {
    let word = U256::from(5_000_000u64).to_be_bytes::<32>();
    assert_eq!(decode_allowance(&word).unwrap(), U256::from(5_000_000u64));
    assert!(decode_allowance(&word[..16]).is_err());
}

#[test]
fn wallet_request_renders_integers_as_strings() {
    let request = TypedDataRequest::new(domain(), sample());
    let json = request.to_json();

    assert_eq!(json["primaryType"], "SpendPermission");
    assert_eq!(json["domain"]["name"], "Spend Permission Manager");
    assert_eq!(json["domain"]["chainId"], 84_532);
    assert_eq!(json["message"]["allowance"], "10000000");
    assert_eq!(json["message"]["period"], "86400");
    assert_eq!(json["message"]["extraData"], "0x6d616769632d7370656e64");
    assert_eq!(json["types"]["SpendPermission"].as_array().unwrap().len(), 11);
    assert_eq!(request.digest().unwrap(), permission_digest(&sample(), &domain()).unwrap());
}

proptest! {
    #[test]
    fn digest_is_deterministic(
        salt in any::<[u8; 32]>(),
        allowance in 1u64..,
        start in 0u64..MAX_UINT48,
        extra in proptest::collection::vec(any::<u8>(), 0..64),
    ) {
        let mut permission = sample();
        permission.salt = U256::from_be_bytes(salt);
        permission.allowance = U256::from(allowance);
        permission.start = start;
        permission.end = start + 1;
        permission.extra_data = Bytes::from(extra);

        let a = permission_digest(&permission, &domain()).unwrap();
        let b = permission_digest(&permission.clone(), &domain()).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn distinct_salts_give_distinct_digests(a in any::<[u8; 32]>(), b in any::<[u8; 32]>()) {
        prop_assume!(a != b);
        let mut first = sample();
        first.salt = U256::from_be_bytes(a);
        let mut second = sample();
        second.salt = U256::from_be_bytes(b);
        prop_assert_ne!(
            permission_digest(&first, &domain()).unwrap(),
            permission_digest(&second, &domain()).unwrap()
        );
    }
}
