//! Built-in compliance blocks used when the remote script is unusable.

/// Revision of the standard these blocks were copied from.
pub const FALLBACK_VERSION: &str = "2025.09";

/// Block key -> script text, in canonical order.
pub const FALLBACK_BLOCKS: &[(&str, &str)] = &[
    (
        "firewall_address_list",
        "/ip firewall address-list
add address=203.0.113.0/26 list=managerIP
add address=203.0.113.64/27 list=SNMP
add address=192.0.2.1 list=BGP-ALLOW
add address=198.18.7.1 list=EOIP-ALLOW
add address=203.0.113.200 list=WALLED-GARDEN",
    ),
    (
        "firewall_filter_input",
        "/ip firewall filter
add action=accept chain=input comment=\"ALLOW MANAGER\" src-address-list=managerIP
add action=accept chain=input comment=\"ALLOW SNMP\" dst-port=161 protocol=udp src-address-list=SNMP
add action=accept chain=input comment=\"ALLOW BGP\" src-address-list=BGP-ALLOW
add action=accept chain=input comment=\"ALLOW EOIP\" src-address-list=EOIP-ALLOW
add action=accept chain=input protocol=icmp
add action=drop chain=input comment=\"DROP INPUT\"",
    ),
    (
        "firewall_service_port",
        "/ip firewall service-port
set sip disabled=yes
set tftp disabled=yes",
    ),
    (
        "ip_service",
        "/ip service
set telnet disabled=yes
set ftp disabled=yes
set www disabled=yes
set api disabled=yes",
    ),
    (
        "dns",
        "/ip dns
set allow-remote-requests=no servers=203.0.113.53,203.0.113.54",
    ),
    (
        "ntp",
        "/system ntp client
set enabled=yes
/system ntp client servers
add address=203.0.113.123",
    ),
    (
        "snmp",
        "/snmp community
set [ find default=yes ] disabled=yes
add addresses=203.0.113.64/27 name=noc-ro
/snmp
set contact=noc@example.net enabled=yes src-address={{LOOP_IP}} trap-community=noc-ro",
    ),
    (
        "radius",
        "/radius
add address=203.0.113.10 secret=noc-radius service=ppp,login src-address={{LOOP_IP}}",
    ),
    (
        "user_aaa",
        "/user aaa
set use-radius=yes",
    ),
    (
        "logging",
        "/system logging action
add name=noc-syslog remote=203.0.113.20 src-address={{LOOP_IP}} target=remote
/system logging
add action=noc-syslog topics=critical,error",
    ),
];

#[cfg(test)]
mod tests {
    use super::FALLBACK_BLOCKS;
    use crate::compliance::COMPLIANCE_ORDER;

    #[test]
    fn covers_every_key_in_order() {
        let keys: Vec<&str> = FALLBACK_BLOCKS.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, COMPLIANCE_ORDER.to_vec());
    }
}
