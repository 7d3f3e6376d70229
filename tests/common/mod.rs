//! Shared fixtures for integration tests: keys, certificates, seals and
//! small OFD packages built on disk.

#![allow(dead_code)]

use der::asn1::{GeneralizedTime, Ia5String, OctetString, UtcTime};
use der::Encode;
use ofd_sign::gm::cert::generate_self_signed;
use ofd_sign::gm::ses::{v1, v4, PictureInfo, SesHeader, SesVersion};
use ofd_sign::package::Workspace;
use rand_core::OsRng;
use std::path::Path;
use std::time::Duration;
use x509_cert::Certificate;

const OFD_NS: &str = "http://www.ofdspec.org/2016";

/// Route `log` output through the test harness.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Fresh SM2 key with a self-signed certificate for `cn`.
pub fn key_pair(cn: &str) -> (sm2::SecretKey, Certificate) {
    let key = sm2::SecretKey::random(&mut OsRng);
    let cert = generate_self_signed(
        &key,
        &format!("CN={},O=ofd_sign,C=CN", cn),
        &[0x01, 0x23],
        Duration::from_secs(3600),
    )
    .unwrap();
    (key, cert)
}

/// Write a package holding exactly `files` to `path`.
pub fn write_package(path: &Path, files: &[(&str, &[u8])]) {
    let ws = Workspace::new_empty().unwrap();
    for (loc, data) in files {
        ws.write_file(loc, data).unwrap();
    }
    ws.repack_to(path).unwrap();
}

/// Write a minimal OFD document with `pages` A4 pages.
pub fn write_ofd(path: &Path, pages: usize) {
    let ws = ofd_workspace(pages);
    ws.repack_to(path).unwrap();
}

/// Unpacked minimal OFD document with `pages` A4 pages.
pub fn ofd_workspace(pages: usize) -> Workspace {
    let ws = Workspace::new_empty().unwrap();
    ws.write_file(
        "/OFD.xml",
        format!(
            r#"<ofd:OFD xmlns:ofd="{}" Version="1.1"><ofd:DocBody><ofd:DocInfo><ofd:DocID>0C1D4F7159954EEEDE517F7285E84DC4</ofd:DocID></ofd:DocInfo><ofd:DocRoot>Doc_0/Document.xml</ofd:DocRoot></ofd:DocBody></ofd:OFD>"#,
            OFD_NS
        )
        .as_bytes(),
    )
    .unwrap();

    let mut page_list = String::new();
    for i in 0..pages {
        page_list.push_str(&format!(
            r#"<ofd:Page ID="{}" BaseLoc="Pages/Page_{}/Content.xml"/>"#,
            i + 1,
            i
        ));
        ws.write_file(
            &format!("/Doc_0/Pages/Page_{}/Content.xml", i),
            format!(r#"<ofd:Page xmlns:ofd="{}"><ofd:Content/></ofd:Page>"#, OFD_NS).as_bytes(),
        )
        .unwrap();
    }
    ws.write_file(
        "/Doc_0/Document.xml",
        format!(
            r#"<ofd:Document xmlns:ofd="{}"><ofd:CommonData><ofd:MaxUnitID>{}</ofd:MaxUnitID><ofd:PageArea><ofd:PhysicalBox>0 0 210 297</ofd:PhysicalBox></ofd:PageArea></ofd:CommonData><ofd:Pages>{}</ofd:Pages></ofd:Document>"#,
            OFD_NS,
            pages + 1,
            page_list
        )
        .as_bytes(),
    )
    .unwrap();
    ws
}

/// Overwrite (or add) one file inside the package at `path`.
pub fn rewrite_entry(path: &Path, loc: &str, data: &[u8]) {
    let ws = Workspace::unpack(path).unwrap();
    ws.write_file(loc, data).unwrap();
    ws.repack_to(path).unwrap();
}

/// Remove one file from the package at `path`.
pub fn remove_entry(path: &Path, loc: &str) {
    let ws = Workspace::unpack(path).unwrap();
    std::fs::remove_file(ws.resolve(loc).unwrap()).unwrap();
    ws.repack_to(path).unwrap();
}

/// Read one file out of the package at `path`.
pub fn read_entry(path: &Path, loc: &str) -> Vec<u8> {
    Workspace::unpack(path).unwrap().read_file(loc).unwrap()
}

fn utc(secs: u64) -> UtcTime {
    UtcTime::from_unix_duration(Duration::from_secs(secs)).unwrap()
}

fn gt(secs: u64) -> GeneralizedTime {
    GeneralizedTime::from_unix_duration(Duration::from_secs(secs)).unwrap()
}

/// A GM/T 0031 seal held by the returned signer key and certificate.
pub fn v1_seal(name: &str) -> (sm2::SecretKey, Certificate, v1::SeSeal) {
    let (maker_key, maker_cert) = key_pair("Seal Maker");
    let (key, cert) = key_pair("Seal Holder");
    let info = v1::SealInfo {
        header: SesHeader::new(SesVersion::V1, "ofd_sign").unwrap(),
        es_id: Ia5String::new("ES-1001").unwrap(),
        property: v1::PropertyInfo {
            seal_type: 1,
            name: name.to_string(),
            cert_list: vec![OctetString::new(cert.to_der().unwrap()).unwrap()],
            create_date: utc(1_600_000_000),
            valid_start: utc(1_600_000_000),
            valid_end: utc(2_000_000_000),
        },
        picture: PictureInfo::new("PNG", vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a], 40, 40)
            .unwrap(),
        ext_datas: None,
    };
    let seal = v1::SeSeal::build(info, &maker_key, &maker_cert).unwrap();
    (key, cert, seal)
}

/// A GB/T 38540 seal held by the returned signer key and certificate.
pub fn v4_seal(name: &str) -> (sm2::SecretKey, Certificate, v4::SeSeal) {
    let (maker_key, maker_cert) = key_pair("Seal Maker");
    let (key, cert) = key_pair("Seal Holder");
    let info = v4::SealInfo {
        header: SesHeader::new(SesVersion::V4, "ofd_sign").unwrap(),
        es_id: Ia5String::new("ES-4001").unwrap(),
        property: v4::PropertyInfo {
            seal_type: 1,
            name: name.to_string(),
            cert_list: v4::CertList::Certs(vec![OctetString::new(cert.to_der().unwrap()).unwrap()]),
            create_date: gt(1_600_000_000),
            valid_start: gt(1_600_000_000),
            valid_end: gt(2_000_000_000),
        },
        picture: PictureInfo::new("OFD", b"<ofd:OFD/>".to_vec(), 42, 42).unwrap(),
        ext_datas: None,
    };
    let seal = v4::SeSeal::build(info, &maker_key, &maker_cert).unwrap();
    (key, cert, seal)
}
