use std::sync::Arc;

use stringref_core::config::SearchConfig;
use stringref_core::model::{Instruction, MethodDef, ModuleDef, OpCode, SequencePoint, TypeDef};
use stringref_core::services::{
    DebugInfoCodeView, SortColumn, SortSpec, StringReferencesService,
};

fn method(token: u32, name: &str, literals: &[&str]) -> MethodDef {
    let mut body = Vec::new();
    let mut points = Vec::new();
    for (i, literal) in literals.iter().enumerate() {
        let offset = i as u32 * 6;
        body.push(Instruction::ldstr(offset, *literal));
        body.push(Instruction::op(offset + 5, OpCode::Pop));
        points.push(SequencePoint::new(offset, "Source.cs", 10 + i as u32, 5));
    }
    MethodDef::new(token, name).with_body(body).with_sequence_points(points)
}

fn app_module() -> Arc<ModuleDef> {
    let mut module = ModuleDef::new("App.dll");
    for t in 0..20u32 {
        let literal = format!("type {t:02}");
        module = module.with_type(
            TypeDef::new("App", format!("T{t:02}"))
                .with_method(method(0x0600_0001 + t, "Run", &[literal.as_str(), "shared"]))
                .with_method(MethodDef::new(0x0600_1000 + t, "Abstract")),
        );
    }
    Arc::new(module)
}

fn other_module() -> Arc<ModuleDef> {
    Arc::new(ModuleDef::new("Other.dll").with_type(
        TypeDef::new("Other", "Only").with_method(method(0x0600_0001, "Go", &["other"])),
    ))
}

fn service(threads: usize) -> StringReferencesService {
    let config = SearchConfig { worker_threads: Some(threads), ..SearchConfig::default() };
    StringReferencesService::new(&config).expect("service")
}

#[test]
fn analyze_populates_index_after_wait() {
    let mut svc = service(4);
    let epoch = svc.analyze_module(app_module());
    let summary = svc.wait_for_scan().expect("scan ran");
    assert_eq!(summary.epoch, epoch);
    assert_eq!(summary.types_scanned, 20);
    assert_eq!(summary.methods_scanned, 20);
    assert_eq!(summary.methods_skipped, 0);
    assert_eq!(summary.references, 40);
    assert_eq!(svc.index().len(), 40);
    assert!(!svc.is_scanning());
    assert_eq!(svc.last_summary(), Some(summary));
}

#[test]
fn wait_without_analysis_returns_none() {
    let mut svc = service(1);
    assert!(svc.wait_for_scan().is_none());
    assert_eq!(svc.pump(), 0);
}

#[test]
fn configured_filter_and_sort_apply_to_results() {
    let config = SearchConfig {
        worker_threads: Some(2),
        filter: "TYPE 1".into(),
        sort: SortSpec::descending(SortColumn::Literal),
        new_tab: false,
    };
    let mut svc = StringReferencesService::new(&config).expect("service");
    svc.analyze_module(app_module());
    svc.wait_for_scan();
    let literals: Vec<&str> = svc.visible().map(|r| r.literal()).collect();
    let expected: Vec<String> = (10..20).rev().map(|t| format!("type {t:02}")).collect();
    assert_eq!(literals, expected);
}

#[test]
fn reanalysis_replaces_previous_results() {
    let mut svc = service(4);
    let first = svc.analyze_module(app_module());
    // Start a second analysis before the first has been drained.
    let second = svc.analyze_module(other_module());
    assert_ne!(first, second);
    let summary = svc.wait_for_scan().expect("scan ran");
    assert_eq!(summary.epoch, second);
    svc.pump();
    let literals: Vec<&str> = svc.index().records().map(|r| r.literal()).collect();
    assert_eq!(literals, ["other"]);
}

#[test]
fn refresh_rescans_the_same_selection() {
    let mut svc = service(2);
    svc.analyze([app_module(), other_module()]);
    svc.wait_for_scan();
    assert_eq!(svc.index().len(), 41);

    let before = svc.index().epoch();
    let after = svc.refresh();
    assert!(after > before);
    svc.wait_for_scan();
    assert_eq!(svc.index().len(), 41);
    assert_eq!(svc.selected_modules().len(), 2);
}

#[test]
fn malformed_methods_are_counted_and_skipped() {
    let module = Arc::new(
        ModuleDef::new("Bad.dll").with_type(
            TypeDef::new("Bad", "T")
                .with_method(MethodDef::new(1, "Broken").with_body(vec![
                    Instruction::ldstr(8, "x"),
                    Instruction::ldstr(2, "y"),
                ]))
                .with_method(method(2, "Fine", &["fine"])),
        ),
    );
    let mut svc = service(1);
    svc.analyze_module(module);
    let summary = svc.wait_for_scan().expect("scan ran");
    assert_eq!(summary.methods_skipped, 1);
    assert_eq!(summary.methods_scanned, 1);
    let literals: Vec<&str> = svc.visible().map(|r| r.literal()).collect();
    assert_eq!(literals, ["fine"]);
}

#[test]
fn selection_and_follow_use_visible_rows() {
    let mut svc = service(2);
    svc.analyze_module(app_module());
    svc.wait_for_scan();
    svc.set_sort(SortSpec::ascending(SortColumn::Literal));
    svc.set_filter("type 05");

    let view = DebugInfoCodeView::new();
    assert!(!svc.follow_selected(false, &view));

    let selected = svc.select(0).expect("row 0").clone();
    assert_eq!(selected.literal(), "type 05");
    assert!(svc.follow_selected(false, &view));
    assert_eq!(view.caret().map(|p| p.line), Some(10));

    assert!(svc.select(5).is_none());
    assert!(svc.current_reference().is_none());
}

#[test]
fn observers_registered_on_the_index_see_scan_batches() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let added = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&added);
    let mut svc = service(3);
    svc.index_mut().subscribe(move |event| {
        if let stringref_core::services::IndexEvent::Added { count, .. } = event {
            counter.fetch_add(*count, Ordering::SeqCst);
        }
    });
    svc.analyze_module(app_module());
    svc.wait_for_scan();
    assert_eq!(added.load(Ordering::SeqCst), 40);
}

#[test]
fn types_without_literals_post_no_batches() {
    use std::sync::Mutex;
    use stringref_core::services::IndexEvent;

    let module = Arc::new(
        ModuleDef::new("Mixed.dll")
            .with_type(
                TypeDef::new("Mixed", "First")
                    .with_method(method(0x0600_0001, "A", &["one", "two"]))
                    .with_method(method(0x0600_0002, "B", &["three"])),
            )
            .with_type(TypeDef::new("Mixed", "NoMethods"))
            .with_type(TypeDef::new("Mixed", "NoLiterals").with_method(
                MethodDef::new(0x0600_0003, "Nop").with_body(vec![
                    Instruction::op(0, OpCode::Nop),
                    Instruction::op(1, OpCode::Ret),
                ]),
            ))
            .with_type(
                TypeDef::new("Mixed", "Bodiless").with_method(MethodDef::new(0x0600_0004, "Ext")),
            )
            .with_type(
                TypeDef::new("Mixed", "Blank").with_method(method(0x0600_0005, "Empty", &["", ""])),
            )
            .with_type(
                TypeDef::new("Mixed", "Last").with_method(method(0x0600_0006, "C", &["four"])),
            ),
    );

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let mut svc = service(4);
    svc.index_mut().subscribe(move |event| {
        if let IndexEvent::Added { count, .. } = event {
            sink.lock().unwrap().push(*count);
        }
    });
    svc.analyze_module(module);
    // Every batch message counts as applied, empty or not.
    let mut applied = 0;
    while svc.is_scanning() {
        applied += svc.pump();
        std::thread::yield_now();
    }
    applied += svc.pump();
    let summary = svc.last_summary().expect("scan finished");
    assert_eq!(applied, 2);

    let counts = events.lock().unwrap().clone();
    assert_eq!(counts.len(), 2, "one batch per type with literals: {counts:?}");
    assert!(counts.iter().all(|&count| count > 0));
    assert_eq!(counts.iter().sum::<usize>(), 4);
    assert_eq!(summary.types_scanned, 6);
    assert_eq!(summary.references, 4);
    assert_eq!(svc.index().len(), 4);
}
