use eframe_board::error::BoardError;
use eframe_board::tree::TreeData;

fn sample_tree() -> TreeData {
    let mut tree = TreeData::with_root("main", "Main Canvas");
    tree.add_canvas("child1", Some("main"), "Child One").unwrap();
    tree.add_canvas("child2", Some("main"), "Child Two").unwrap();
    tree.add_canvas("grandchild", Some("child1"), "Grandchild")
        .unwrap();
    tree
}

#[test]
fn add_and_path() {
    let tree = sample_tree();
    tree.validate().unwrap();

    assert_eq!(
        tree.path_to("grandchild").unwrap(),
        vec!["main", "child1", "grandchild"]
    );
    assert_eq!(tree.path_to("main").unwrap(), vec!["main"]);
    assert!(matches!(
        tree.path_to("nope"),
        Err(BoardError::NotFound(_))
    ));
}

#[test]
fn duplicate_or_dangling_adds_are_refused() {
    let mut tree = sample_tree();
    assert!(matches!(
        tree.add_canvas("child1", Some("main"), "dup"),
        Err(BoardError::InvalidTreeEdit(_))
    ));
    assert!(matches!(
        tree.add_canvas("orphan", Some("missing"), "x"),
        Err(BoardError::InvalidTreeEdit(_))
    ));
    tree.validate().unwrap();
}

#[test]
fn remove_reparents_children() {
    let mut tree = sample_tree();
    tree.remove_canvas("child1").unwrap();

    // The grandchild is promoted to the removed canvas's parent.
    assert_eq!(tree.get("grandchild").unwrap().parent.as_deref(), Some("main"));
    assert!(tree.get("main").unwrap().children.contains(&"grandchild".to_owned()));
    assert!(!tree.contains("child1"));
    tree.validate().unwrap();
}

#[test]
fn remove_root_promotes_children_to_roots() {
    let mut tree = sample_tree();
    tree.remove_canvas("main").unwrap();

    assert!(tree.root_canvases.contains(&"child1".to_owned()));
    assert!(tree.root_canvases.contains(&"child2".to_owned()));
    assert!(tree.get("child1").unwrap().parent.is_none());
    tree.validate().unwrap();
}

#[test]
fn move_canvas_reparents() {
    let mut tree = sample_tree();
    tree.move_canvas("child2", Some("child1")).unwrap();
    assert_eq!(
        tree.path_to("child2").unwrap(),
        vec!["main", "child1", "child2"]
    );

    tree.move_canvas("child2", None).unwrap();
    assert!(tree.root_canvases.contains(&"child2".to_owned()));
    tree.validate().unwrap();
}

#[test]
fn cycles_are_refused() {
    let mut tree = sample_tree();

    let before = tree.clone();
    assert!(matches!(
        tree.move_canvas("main", Some("grandchild")),
        Err(BoardError::InvalidTreeEdit(_))
    ));
    assert!(matches!(
        tree.move_canvas("child1", Some("child1")),
        Err(BoardError::InvalidTreeEdit(_))
    ));
    // Refused edits leave the tree untouched.
    assert_eq!(tree, before);
}

#[test]
fn rename_updates_name() {
    let mut tree = sample_tree();
    tree.rename("child1", "Renamed").unwrap();
    assert_eq!(tree.name_of("child1"), Some("Renamed"));
    assert!(tree.rename("missing", "x").is_err());
}

#[test]
fn wire_format_uses_camel_case() {
    let tree = TreeData::with_root("main", "Main Canvas");
    let json = serde_json::to_value(&tree).unwrap();
    assert!(json.get("rootCanvases").is_some());
    assert_eq!(json["canvases"]["main"]["name"], "Main Canvas");
    assert!(json["canvases"]["main"]["parent"].is_null());
}
