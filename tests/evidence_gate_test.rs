//! Evidence gate: accepted contact values are literals of the evidence

use kodegen_tools_campusscrape::evidence::{
    EvidenceGate, EvidenceRecord, FieldSchema, Provenance, gate_schedule_item,
};
use kodegen_tools_campusscrape::utils::NO_EVIDENCE;
use proptest::prelude::*;
use serde_json::{Value, json};

mod common;
use common::{create_test_html, html_page};

const TEXT_PIECES: &[&str] = &[
    "Kampus Merdeka",
    "Email: info@kampus.ac.id",
    "Telp. (021) 786-7222",
    "Hubungi WhatsApp 0812-3456-7890",
    "Jl. Margonda Raya No. 100",
    "Kode pos 16424",
    "logo@2x.png",
    "Ikuti kami di media sosial",
];

const LINK_PIECES: &[&str] = &[
    "https://www.facebook.com/kampus.merdeka",
    "https://www.facebook.com/sharer/sharer.php?u=x",
    "https://instagram.com/kampusmerdeka",
    "https://wa.me/6281234567890",
    "tel:+62217867222",
    "https://youtube.com/@kampus",
];

const PROPOSALS: &[&str] = &[
    "info@kampus.ac.id",
    "fake@nowhere.com",
    "021 7867222",
    "0800-000-000",
    "081234567890",
    "https://facebook.com/fake",
    "https://www.facebook.com/kampus.merdeka",
    "https://instagram.com/kampusmerdeka",
    "16424",
    "99999",
    "-",
    "",
];

fn evidence_strategy() -> impl Strategy<Value = EvidenceRecord> {
    (
        prop::collection::vec(prop::sample::select(TEXT_PIECES), 0..6),
        prop::collection::vec(prop::sample::select(LINK_PIECES), 0..4),
    )
        .prop_map(|(text, links)| {
            EvidenceRecord::new(
                text.join(". "),
                links.into_iter().map(str::to_string).collect(),
            )
        })
}

fn proposal_strategy() -> impl Strategy<Value = Value> {
    prop::collection::vec(prop::sample::select(PROPOSALS), 14).prop_map(|values| {
        let keys = FieldSchema::contact().keys().collect::<Vec<_>>();
        let object: serde_json::Map<String, Value> = keys
            .into_iter()
            .zip(values)
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect();
        Value::Object(object)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn evidence_bound_values_occur_in_the_evidence(
        evidence in evidence_strategy(),
        proposed in proposal_strategy(),
    ) {
        let schema = FieldSchema::contact();
        let accepted = EvidenceGate::new(schema.clone()).enforce(&proposed, &evidence);

        prop_assert_eq!(accepted.len(), schema.fields().len());
        for field in accepted.iter() {
            let class = schema.class_of(&field.key).expect("schema key");
            if class.is_evidence_bound() && !field.is_sentinel() {
                prop_assert!(
                    evidence.contains(&field.value),
                    "{} = {:?} not in evidence",
                    field.key,
                    field.value
                );
            }
        }
    }

    #[test]
    fn empty_evidence_yields_only_sentinels_for_bound_fields(proposed in proposal_strategy()) {
        let schema = FieldSchema::contact();
        let accepted = EvidenceGate::new(schema.clone()).enforce(&proposed, &EvidenceRecord::default());
        for field in accepted.iter() {
            if schema.class_of(&field.key).expect("schema key").is_evidence_bound() {
                prop_assert_eq!(field.value.as_str(), NO_EVIDENCE);
                prop_assert_eq!(field.provenance, Provenance::NoEvidence);
            }
        }
    }
}

#[test]
fn non_object_proposal_is_all_sentinels() {
    let gate = EvidenceGate::new(FieldSchema::narrative());
    let accepted = gate.enforce(&json!("not json"), &EvidenceRecord::new("Visi: unggul", vec![]));
    assert_eq!(accepted.len(), 3);
    assert!(accepted.iter().all(|f| f.is_sentinel()));
}

#[test]
fn choice_fields_accept_only_listed_values() {
    let gate = EvidenceGate::new(FieldSchema::contact());
    let accepted = gate.enforce(
        &json!({"type": "University", "status": "semi-private", "accreditation": "a"}),
        &EvidenceRecord::default(),
    );
    assert_eq!(accepted.value("type"), "university");
    assert_eq!(accepted.value("status"), NO_EVIDENCE);
    assert_eq!(accepted.value("accreditation"), "A");
}

#[test]
fn schedule_dates_need_their_year_in_the_text() {
    let evidence = EvidenceRecord::new("Pendaftaran SNBT dibuka Maret 2026", vec![]);

    let kept = gate_schedule_item(
        &json!({"name": "SNBT", "registration_start": "2026-03-01", "registration_end": "2027-01-01"}),
        Some(&evidence),
    )
    .expect("item with one grounded date");
    assert_eq!(kept.registration_start.as_deref(), Some("2026-03-01"));
    assert_eq!(kept.registration_end, None);
    assert_eq!(kept.slug, "snbt");

    let rejected = gate_schedule_item(
        &json!({"name": "SNBT", "registration_end": "2031-01-01"}),
        Some(&evidence),
    );
    assert!(rejected.is_err());

    // Byte-grounded items skip the year check
    let from_pdf = gate_schedule_item(
        &json!({"name": "SNBT", "registration_end": "2031-01-01"}),
        None,
    )
    .expect("structural checks only");
    assert_eq!(from_pdf.registration_end.as_deref(), Some("2031-01-01"));
}

#[test]
fn unparseable_dates_are_kept_verbatim() {
    let evidence = EvidenceRecord::new("Gelombang 1 ditutup akhir Mei", vec![]);
    let item = gate_schedule_item(
        &json!({"name": "Gelombang 1", "registration_end": "akhir Mei"}),
        Some(&evidence),
    )
    .expect("item");
    assert_eq!(item.registration_end.as_deref(), Some("akhir Mei"));
}

#[test]
fn contact_hrefs_on_the_page_confirm_values() {
    let page = html_page(
        "https://kampus.ac.id/kontak",
        &create_test_html(
            "Kontak",
            r#"<p>Hubungi kami</p>
               <a href="tel:+62217867222">Hubungi</a>
               <a href="mailto:pmb@kampus.ac.id">Surel</a>"#,
        ),
    );
    let evidence = EvidenceRecord::from_fetch(&page);
    assert!(!evidence.text().contains("7867222"));

    let accepted = EvidenceGate::new(FieldSchema::contact()).enforce(
        &json!({"phone": "+62 21 7867222", "email": "pmb@kampus.ac.id"}),
        &evidence,
    );
    assert_eq!(accepted.value("phone"), "+62217867222");
    assert_eq!(accepted.value("email"), "pmb@kampus.ac.id");
}
