use json_storage::{DiskBackend, Storage};
use serde_json::json;
use std::sync::Arc;

fn main() -> Result<(), json_storage::Error> {
    let path = std::env::temp_dir().join("json_storage_example_basic.json");
    let _ = std::fs::remove_file(&path);
    let backend = Arc::new(DiskBackend::new());

    // two components sharing one file
    let app = Storage::with_name(backend.clone(), &path, "app", false)?;
    let plugin = Storage::with_name(backend.clone(), &path, "plugin", false)?;

    app.set("theme", "dark")?;
    app.defaults(json!({"theme": "light", "font_size": 14}))?;
    plugin.set("enabled", true)?;
    println!("app    = {:?}", app.get_all()?);
    println!("plugin = {:?}", plugin.get_all()?);

    // nested paths and child storages
    app.set_path("window.size.width", 1280)?;
    let window = app.create_storage("window")?;
    window.merge(json!({"size": {"height": 800}, "maximized": false}))?;
    println!("window = {:?}", window.get_all()?);

    // property-style access
    let props = app.facade();
    let size: Option<u32> = props.get("font_size")?;
    println!("font_size = {size:?}, keys = {:?}", props.keys()?);

    app.delete("theme")?;
    println!("on disk:\n{}", std::fs::read_to_string(&path).unwrap_or_default());

    let _ = std::fs::remove_file(&path);
    Ok(())
}
