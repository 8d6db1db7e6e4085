pub mod assets;
pub mod handler;
pub mod renderer;
pub mod scene;
pub mod title;

pub use assets::{AssetProvider, FontResource, FontSource, VectorAsset};
pub use handler::{create_og_router, og_image};
pub use renderer::{RenderOptions, RenderedImage, render, render_async};
pub use scene::{SceneDescription, SceneStyle, compose};
pub use title::{SanitizedTitle, sanitize};
