/// Display key derivation for sensors
use crate::config::NamesConfig;
use crate::models::MacAddress;

/// Resolve the stable key a device is registered and published under
///
/// A usable nickname wins when the policy allows it; otherwise the key is the
/// prefix followed by the uppercase hex of the address (all 6 bytes with
/// `full_mac`, the trailing 3 otherwise).
pub fn resolve_key(mac: &MacAddress, nickname: Option<&str>, names: &NamesConfig) -> String {
    let nickname = nickname.map(str::trim).filter(|n| !n.is_empty());

    if let (true, Some(nickname)) = (names.use_nickname, nickname) {
        return if names.prefix_nickname {
            format!("{}{}", names.prefix, nickname)
        } else {
            nickname.to_string()
        };
    }

    let octets = if names.full_mac {
        &mac.octets()[..]
    } else {
        &mac.octets()[3..]
    };
    let hex: String = octets.iter().map(|b| format!("{:02X}", b)).collect();
    format!("{}{}", names.prefix, hex)
}
