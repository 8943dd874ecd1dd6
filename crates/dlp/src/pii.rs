//! PII redaction for ingress text.

use crate::DlpScanner;

const EMAIL_MARKER: &str = "[REDACTED_EMAIL]";
const IP_MARKER: &str = "[REDACTED_IP]";
const PCI_MARKER: &str = "[REDACTED_PCI]";

pub(crate) fn redact(scanner: &DlpScanner, text: &str) -> String {
    // Fixed application order; each pass operates on the output of the
    // previous one, so an overlap is claimed by the earlier pattern.
    let pass = scanner.email_re().replace_all(text, EMAIL_MARKER);
    let pass = scanner.ipv4_re().replace_all(&pass, IP_MARKER);
    let text: &str = &pass;

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in scanner.pci_re().find_iter(text) {
        out.push_str(&text[last..m.start()]);
        if is_card_number(m.as_str()) {
            out.push_str(PCI_MARKER);
        } else {
            out.push_str(m.as_str());
        }
        last = m.end();
    }
    out.push_str(&text[last..]);
    out
}

/// A candidate run is a card number when it has 13-16 digits and passes
/// the Luhn checksum.
fn is_card_number(candidate: &str) -> bool {
    let digits: Vec<u32> = candidate
        .chars()
        .filter_map(|c| c.to_digit(10))
        .collect();
    if !(13..=16).contains(&digits.len()) {
        return false;
    }
    luhn(&digits)
}

fn luhn(digits: &[u32]) -> bool {
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}
