//! Hot reload client injection (development only).
//!
//! The dev server owns the WebSocket endpoint and rebuild loop; this
//! plugin contributes the client module and wires it into the HTML
//! shell. It must run after the shell plugin.

use super::{BuildPlugin, PluginContext};
use crate::pipeline::{BuildArtifacts, BuildError};

/// URL path of the reload client module.
pub const CLIENT_PATH: &str = "__kiln/client.js";

/// URL path of the reload WebSocket endpoint.
pub const WS_PATH: &str = "/__kiln/ws";

/// Injects the reload client into the served page.
#[derive(Debug, Default)]
pub struct HotReload;

impl HotReload {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// The client module served at [`CLIENT_PATH`].
#[must_use]
pub fn client_source() -> String {
    format!(
        r#"(function () {{
  var proto = location.protocol === 'https:' ? 'wss://' : 'ws://';
  var socket = new WebSocket(proto + location.host + '{WS_PATH}');
  socket.addEventListener('message', function (event) {{
    var msg = JSON.parse(event.data);
    if (msg.type === 'reload') {{
      location.reload();
    }} else if (msg.type === 'error') {{
      console.error('[kiln] build failed: ' + msg.message);
    }}
  }});
  socket.addEventListener('close', function () {{
    console.log('[kiln] dev server disconnected');
  }});
}})();
"#
    )
}

impl BuildPlugin for HotReload {
    fn name(&self) -> &'static str {
        "hot-reload"
    }

    fn after_emit(
        &self,
        ctx: &PluginContext<'_>,
        artifacts: &mut BuildArtifacts,
    ) -> Result<(), BuildError> {
        artifacts.push(CLIENT_PATH, client_source().into_bytes());

        let tag = format!("<script src=\"{}\"></script>", ctx.output.url(CLIENT_PATH));
        if let Some(html) = artifacts.get_mut("index.html") {
            let text = String::from_utf8_lossy(&html.contents).into_owned();
            let injected = match text.find("</body>") {
                Some(idx) => {
                    let mut out = String::with_capacity(text.len() + tag.len());
                    out.push_str(&text[..idx]);
                    out.push_str(&tag);
                    out.push_str(&text[idx..]);
                    out
                }
                None => format!("{text}{tag}"),
            };
            html.contents = injected.into_bytes();
        }

        Ok(())
    }
}
