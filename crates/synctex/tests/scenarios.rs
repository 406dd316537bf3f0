//! End-to-end scenarios from spec.md §8.2, driven through the public
//! `Scanner` API.

use std::io::Write;

use pretty_assertions::assert_eq;

use synctex::{Scanner, ScannerOptions};
use synctex_model::{Node, NodeKind};

fn scanner_for(contents: &str) -> Scanner {
    let dir = tempfile::tempdir().unwrap();
    let synctex_path = dir.path().join("doc.synctex");
    let mut f = std::fs::File::create(&synctex_path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    drop(f);

    let options = ScannerOptions { output: dir.path().join("doc.pdf"), build_directory: None, parse: true, strong_mode: false };
    // Parsing happens synchronously inside `new_with_output_file`, reading
    // the whole file into the tree before `dir` is dropped at the end of
    // this function.
    Scanner::new_with_output_file(options).unwrap()
}

const S1: &str = "SyncTeX Version:1\nInput:1:./1.tex\nOutput:pdf\nMagnification:1000\nUnit:1\nX Offset:0\nY Offset:0\nContent:\n{1\n[1,10:20,350:330,330,0\n]\n}\nPostamble:\nCount:1\n";

#[test]
fn s1_minimal_vbox() {
    let scanner = scanner_for(S1);
    let sheet = scanner.sheet(1).expect("page 1 exists");
    assert_eq!(scanner.tree().node(sheet).page(), Some(1));

    let vbox = scanner.tree().node(sheet).child().expect("vbox child");
    assert_eq!(scanner.tree().node(vbox).kind(), NodeKind::VBox);
    let loc = scanner.tree().tlc(vbox).unwrap();
    assert_eq!((loc.tag, loc.line), (1, 10));
    assert_eq!(scanner.tree().node(vbox).point(), Some(synctex_model::Point { h: 20, v: 350 }));
    assert_eq!(scanner.tree().node(vbox).dims(), Some(synctex_model::BoxDims { width: 330, height: 330, depth: 0 }));
}

const S2: &str = "SyncTeX Version:1\nInput:1:./1.tex\nOutput:pdf\nMagnification:1000\nUnit:1\nX Offset:0\nY Offset:0\nContent:\n{1\n(1,10:20,350:330,330,0\n)\n}\nPostamble:\nCount:1\n";

#[test]
fn s2_hbox_box_bdry_synthesis() {
    let scanner = scanner_for(S2);
    let sheet = scanner.sheet(1).unwrap();
    let hbox = scanner.tree().node(sheet).child().unwrap();
    assert_eq!(scanner.tree().node(hbox).kind(), NodeKind::HBox);

    let children: Vec<_> = scanner.tree().siblings(scanner.tree().node(hbox).child()).collect();
    assert_eq!(children.len(), 2, "opening and closing BoxBdry only, no content");
    for &c in &children {
        assert_eq!(scanner.tree().node(c).kind(), NodeKind::BoxBdry);
        let loc = scanner.tree().node(c).own_loc().unwrap();
        assert_eq!((loc.tag, loc.line), (1, 10));
    }

    // P8: with no overflowing children, the inflated V-box is just the
    // hbox's own raw dimensions, not zero.
    let inflated = scanner.tree().node(hbox).inflated().unwrap();
    assert_eq!(inflated.width, 330);
    assert_eq!(inflated.height, 330);
    assert_eq!(inflated.depth, 0);
}

const S3: &str = "SyncTeX Version:1\nInput:1:./1.tex\nOutput:pdf\nMagnification:1000\nUnit:1\nX Offset:0\nY Offset:0\nContent:\n{1\n[1,10:20,350:330,330,0\nf1000:50,100\n]\n}\n<1000\n(1,63:0,0:100,8,3\n)\n>\nPostamble:\nCount:2\n";

#[test]
fn s3_form_ref_expansion() {
    let scanner = scanner_for(S3);
    let sheet = scanner.sheet(1).unwrap();
    let vbox = scanner.tree().node(sheet).child().unwrap();
    let proxy = scanner.tree().node(vbox).last().expect("ref expanded into a trailing proxy");
    assert_eq!(scanner.tree().node(proxy).kind(), NodeKind::ProxyHBox);

    // P5: p.v == ref.v - content.height == 100 - 8 == 92.
    let offset = scanner.tree().node(proxy).offset();
    assert_eq!(offset, synctex_model::Point { h: 50, v: 92 });

    let target = scanner.tree().node(proxy).target().unwrap();
    let loc = scanner.tree().tlc(target).unwrap();
    assert_eq!((loc.tag, loc.line), (1, 63));
}

const S6: &str = "SyncTeX Version:1\nInput:1:./1.tex\nOutput:pdf\nMagnification:1000\nUnit:1\nX Offset:0\nY Offset:0\nContent:\n{1\nr2,5:100,200:-50,10,5\n}\nPostamble:\nCount:1\n";

#[test]
fn s6_negative_width_rule() {
    let scanner = scanner_for(S6);
    let sheet = scanner.sheet(1).unwrap();
    let rule = scanner.tree().node(sheet).child().unwrap();
    assert!(matches!(scanner.tree().node(rule), Node::Rule(_)));

    assert_eq!(scanner.visible_width(rule), 50.0 * scanner.unit());
    assert_eq!(scanner.visible_h(rule), (100.0 - (-50.0)) * scanner.unit() + scanner.x_offset());
}
