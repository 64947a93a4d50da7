use lopdf::content::{Content, Operation};
use lopdf::{dictionary, encryption, Document, Object, Stream};

// Standard security handler padding string (PDF 1.7, 7.6.3.3)
const PASSWORD_PADDING: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// Builds an in-memory PDF with one page per entry; empty entries give blank pages.
pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    save(document_with_pages(pages))
}

/// Same pages as [`pdf_with_pages`], RC4-encrypted (revision 2, 40-bit) for
/// `user_password`. An empty password gives a file any reader can open.
pub fn encrypted_pdf_with_pages(pages: &[&str], user_password: &str) -> Vec<u8> {
    let mut doc = document_with_pages(pages);

    let file_id = b"pdf-brief-sample".to_vec();
    let mut encrypt = dictionary! {
        "Filter" => "Standard",
        "V" => 1,
        "R" => 2,
        "Length" => 40,
        "O" => Object::string_literal(vec![0x5A_u8; 32]),
        "P" => -4,
    };
    let encrypt_id = doc.add_object(encrypt.clone());
    doc.trailer.set("Encrypt", encrypt_id);
    doc.trailer.set(
        "ID",
        vec![
            Object::string_literal(file_id.clone()),
            Object::string_literal(file_id),
        ],
    );

    let key = encryption::get_encryption_key(&doc, user_password, false)
        .expect("encryption key should derive");
    encrypt.set("U", Object::string_literal(rc4(&key, &PASSWORD_PADDING)));
    doc.objects.insert(encrypt_id, Object::Dictionary(encrypt));

    for (&id, object) in doc.objects.iter_mut() {
        if id == encrypt_id {
            continue;
        }
        // RC4 is symmetric: the per-object decryption routine also encrypts
        let Ok(cipher) = encryption::decrypt_object(&key, id, object) else {
            continue;
        };
        match object {
            Object::Stream(stream) => stream.set_content(cipher),
            Object::String(content, _) => *content = cipher,
            _ => {}
        }
    }

    save(doc)
}

fn document_with_pages(pages: &[&str]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let operations = if text.is_empty() {
            Vec::new()
        } else {
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ]
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("content should encode"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

fn save(mut doc: Document) -> Vec<u8> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("pdf should serialize");
    bytes
}

fn rc4(key: &[u8], input: &[u8]) -> Vec<u8> {
    let mut state: Vec<u8> = (0..=255).collect();
    let mut j = 0_u8;
    for i in 0..256 {
        j = j.wrapping_add(state[i]).wrapping_add(key[i % key.len()]);
        state.swap(i, j as usize);
    }

    let (mut i, mut j) = (0_u8, 0_u8);
    input
        .iter()
        .map(|byte| {
            i = i.wrapping_add(1);
            j = j.wrapping_add(state[i as usize]);
            state.swap(i as usize, j as usize);
            byte ^ state[state[i as usize].wrapping_add(state[j as usize]) as usize]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::rc4;

    #[test]
    fn rc4_matches_known_vector() {
        assert_eq!(
            rc4(b"Key", b"Plaintext"),
            vec![0xBB, 0xF3, 0x16, 0xE8, 0xD9, 0x40, 0xAF, 0x0A, 0xD3]
        );
    }
}
