#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

/// Commands whose whole remainder is free text.
pub(crate) const RAW_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "topic",
        action: "set_topic",
    },
    CommandSpec {
        command: "headline",
        action: "set_headline",
    },
    CommandSpec {
        command: "highlight",
        action: "set_highlight",
    },
];

pub(crate) const SINGLE_PATH_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "image",
        action: "set_image",
    },
    CommandSpec {
        command: "preview",
        action: "preview",
    },
];

pub(crate) const NUMBER_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "scale",
        action: "set_scale",
    },
    CommandSpec {
        command: "width",
        action: "set_container_width",
    },
];

pub(crate) const SELECT_COMMAND: CommandSpec = CommandSpec {
    command: "select",
    action: "select_template",
};

pub(crate) const DRAG_COMMAND: CommandSpec = CommandSpec {
    command: "drag",
    action: "drag",
};

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "generate",
        action: "generate",
    },
    CommandSpec {
        command: "reopen",
        action: "reopen_editor",
    },
    CommandSpec {
        command: "back",
        action: "back",
    },
    CommandSpec {
        command: "bg_toggle",
        action: "toggle_background_removal",
    },
    CommandSpec {
        command: "export",
        action: "export",
    },
    CommandSpec {
        command: "status",
        action: "status",
    },
    CommandSpec {
        command: "wait",
        action: "wait",
    },
    CommandSpec {
        command: "help",
        action: "help",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
    },
    CommandSpec {
        command: "exit",
        action: "quit",
    },
];

pub const STUDIO_HELP_COMMANDS: &[&str] = &[
    "/topic <text>",
    "/image <path>",
    "/generate",
    "/select <n>",
    "/reopen",
    "/back",
    "/headline <text>",
    "/highlight <word>",
    "/scale <0.5-2.0>",
    "/drag <x0> <y0> <x1> <y1>",
    "/bg_toggle",
    "/width <px>",
    "/preview [path]",
    "/export",
    "/status",
    "/wait",
    "/help",
    "/quit",
];
