//! Parser for `ord` inscription envelopes carried in taproot reveal scripts.
//!
//! An envelope is `OP_FALSE OP_IF "ord" (<tag> <value>)* OP_0 <body>* OP_ENDIF`. Tag `1` holds the
//! content type. Unknown tags are skipped.

use bitcoin::{
    opcodes::all::{OP_ENDIF, OP_IF, OP_PUSHNUM_1, OP_PUSHNUM_16},
    script::Instruction,
    Script, Transaction,
};

/// Protocol marker pushed right after `OP_IF`.
pub const PROTOCOL_ID: &[u8] = b"ord";

/// Field tag for the content type.
pub const TAG_CONTENT_TYPE: u8 = 1;

/// An envelope found in a script.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Envelope {
    pub content_type: Option<Vec<u8>>,
    pub body: Vec<u8>,
}

/// An inscription revealed by a transaction, tagged with the input carrying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInscription {
    pub input_index: usize,
    pub envelope: Envelope,
}

/// Returns every inscription `tx` reveals, in input order.
///
/// The position in the returned list is the inscription's index within the transaction.
pub fn parse_inscriptions(tx: &Transaction) -> Vec<ParsedInscription> {
    tx.input
        .iter()
        .enumerate()
        .filter_map(|(input_index, txin)| {
            let leaf = txin.witness.taproot_leaf_script()?;
            Some((input_index, parse_envelopes(leaf.script)))
        })
        .flat_map(|(input_index, envelopes)| {
            envelopes.into_iter().map(move |envelope| ParsedInscription {
                input_index,
                envelope,
            })
        })
        .collect()
}

/// Extracts all well-formed envelopes from `script`, skipping malformed ones.
pub fn parse_envelopes(script: &Script) -> Vec<Envelope> {
    let instructions: Vec<_> = script.instructions().map_while(Result::ok).collect();

    let mut envelopes = Vec::new();
    let mut i = 0;
    while i < instructions.len() {
        if is_envelope_start(&instructions[i..]) {
            if let Some((envelope, consumed)) = parse_fields_and_body(&instructions[i + 3..]) {
                envelopes.push(envelope);
                i += 3 + consumed;
                continue;
            }
        }
        i += 1;
    }
    envelopes
}

fn is_envelope_start(ins: &[Instruction<'_>]) -> bool {
    matches!(
        ins,
        [Instruction::PushBytes(fals), Instruction::Op(op), Instruction::PushBytes(id), ..]
            if fals.is_empty() && *op == OP_IF && id.as_bytes() == PROTOCOL_ID
    )
}

/// Parses from just past the protocol id through `OP_ENDIF`. Returns the envelope and the number
/// of instructions consumed.
fn parse_fields_and_body(ins: &[Instruction<'_>]) -> Option<(Envelope, usize)> {
    let mut envelope = Envelope::default();
    let mut in_body = false;
    let mut k = 0;

    while k < ins.len() {
        match &ins[k] {
            Instruction::Op(op) if *op == OP_ENDIF => return Some((envelope, k + 1)),
            other if in_body => {
                envelope.body.extend(push_data(other)?);
                k += 1;
            }
            Instruction::PushBytes(sep) if sep.is_empty() => {
                in_body = true;
                k += 1;
            }
            tag => {
                let tag = push_data(tag)?;
                let value = push_data(ins.get(k + 1)?)?;
                if tag == [TAG_CONTENT_TYPE] && envelope.content_type.is_none() {
                    envelope.content_type = Some(value);
                }
                k += 2;
            }
        }
    }

    // No OP_ENDIF.
    None
}

fn push_data(ins: &Instruction<'_>) -> Option<Vec<u8>> {
    match ins {
        Instruction::PushBytes(p) => Some(p.as_bytes().to_vec()),
        Instruction::Op(op) => {
            let code = op.to_u8();
            (OP_PUSHNUM_1.to_u8()..=OP_PUSHNUM_16.to_u8())
                .contains(&code)
                .then(|| vec![code - OP_PUSHNUM_1.to_u8() + 1])
        }
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use bitcoin::{
        opcodes::{all::OP_CHECKSIG, OP_FALSE},
        script::{Builder, PushBytesBuf},
        ScriptBuf, Witness,
    };

    use super::*;

    /// Reveal script: `<key> OP_CHECKSIG` followed by one envelope.
    pub(crate) fn inscription_script(content_type: &[u8], body: &[u8]) -> ScriptBuf {
        inscriptions_script(content_type, &[body])
    }

    /// Reveal script carrying one envelope per entry of `bodies`, all with `content_type`.
    pub(crate) fn inscriptions_script(content_type: &[u8], bodies: &[&[u8]]) -> ScriptBuf {
        let mut b = Builder::new()
            .push_slice([0x42u8; 32])
            .push_opcode(OP_CHECKSIG);
        for body in bodies {
            b = b
                .push_opcode(OP_FALSE)
                .push_opcode(OP_IF)
                .push_slice(*b"ord")
                .push_slice([TAG_CONTENT_TYPE])
                .push_slice(PushBytesBuf::try_from(content_type.to_vec()).unwrap())
                .push_opcode(OP_FALSE);
            for chunk in body.chunks(520) {
                b = b.push_slice(PushBytesBuf::try_from(chunk.to_vec()).unwrap());
            }
            b = b.push_opcode(OP_ENDIF);
        }
        b.into_script()
    }

    /// Script-path witness revealing `script`.
    pub(crate) fn reveal_witness(script: &ScriptBuf) -> Witness {
        let mut control_block = vec![0xc0];
        control_block.extend([0x02; 32]);
        Witness::from_slice(&[script.to_bytes(), control_block])
    }
}
