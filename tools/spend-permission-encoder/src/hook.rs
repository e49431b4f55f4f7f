use alloy_primitives::Address;
use spend_permission_types::TokenKind;

/// Enforcement hook contracts deployed on the active network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HookAddresses {
    pub erc20: Address,
    pub native: Address,
}

/// Pick the hook for a permission.
///
/// | auxiliary funds | token kind | hook |
/// |---|---|---|
/// | no  | any      | zero address |
/// | yes | fungible | `hooks.erc20` |
/// | yes | native   | `hooks.native` |
pub fn select_hook(kind: TokenKind, auxiliary_funds_supported: bool, hooks: &HookAddresses) -> Address {
    if !auxiliary_funds_supported {
        return Address::ZERO;
    }
    match kind {
        TokenKind::Native => hooks.native,
        TokenKind::Fungible => hooks.erc20,
    }
}

/// Same as [`select_hook`] for a form symbol; unknown symbols get the fungible policy.
pub fn select_hook_for_symbol(
    symbol: &str,
    auxiliary_funds_supported: bool,
    hooks: &HookAddresses,
) -> Address {
    select_hook(TokenKind::from_symbol(symbol), auxiliary_funds_supported, hooks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hooks() -> HookAddresses {
        HookAddresses {
            erc20: Address::repeat_byte(0xe2),
            native: Address::repeat_byte(0xee),
        }
    }

    #[test]
    fn hook_table() {
        let hooks = hooks();
        let cases = [
            ("USDC", false, Address::ZERO),
            ("ETH", false, Address::ZERO),
            ("WBTC", false, Address::ZERO),
            ("USDC", true, hooks.erc20),
            ("ETH", true, hooks.native),
            ("WBTC", true, hooks.erc20),
            ("eth", true, hooks.native),
            ("", true, hooks.erc20),
            ("", false, Address::ZERO),
        ];
        for (symbol, aux, expected) in cases {
            assert_eq!(
                select_hook_for_symbol(symbol, aux, &hooks),
                expected,
                "symbol={symbol:?} aux={aux}"
            );
        }
    }
}
