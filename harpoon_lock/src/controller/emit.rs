use std::fmt;

use crate::auth::Label;
use crate::controller::table::{CaseArm, ControllerTable};

/// Formats the table as a synthesizable Verilog module.
///
/// Every output is registered. States outside the table fall back to state 0
/// with the reset output, so an upset register cannot reach the unlock state.
impl fmt::Display for ControllerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sw = self.state_width();
        let reset_output = self.reset_output().to_verilog();

        writeln!(f, "module {} (", self.module())?;
        writeln!(f, "    input  wire clk,")?;
        writeln!(f, "    input  wire reset,")?;
        writeln!(f, "    input  wire [{}:0] ip_vec,", self.input_width() - 1)?;
        writeln!(f, "    output reg  [{}:0] op_vec,", self.output_width() - 1)?;
        writeln!(f, "    output reg  reset_orig_fsm")?;
        writeln!(f, ");")?;
        writeln!(f)?;
        writeln!(f, "  reg [{}:0] state;", sw - 1)?;
        writeln!(f, "  reg reset_flag;")?;
        writeln!(f)?;

        writeln!(f, "  always @(posedge clk)")?;
        writeln!(f, "    begin")?;
        writeln!(f, "      if (reset)")?;
        writeln!(f, "        begin")?;
        writeln!(f, "          state <= {sw}'d0;")?;
        writeln!(f, "          reset_orig_fsm <= 1'b0;")?;
        writeln!(f, "          reset_flag <= 1'b0;")?;
        writeln!(f, "          op_vec <= {reset_output};")?;
        writeln!(f, "        end")?;
        writeln!(f, "      else")?;
        writeln!(f, "        begin")?;
        writeln!(f, "          case (state)")?;

        for row in self.rows() {
            writeln!(f, "            {sw}'d{}: begin", row.state)?;
            writeln!(f, "              case (ip_vec)")?;
            for arm in &row.arms {
                write_arm(f, self, arm)?;
            }
            writeln!(f, "              endcase")?;
            writeln!(f, "            end")?;
        }

        writeln!(f, "            default: begin")?;
        writeln!(f, "              state <= {sw}'d0;")?;
        writeln!(f, "              reset_orig_fsm <= 1'b0;")?;
        writeln!(f, "              op_vec <= {reset_output};")?;
        writeln!(f, "            end")?;
        writeln!(f, "          endcase")?;
        writeln!(f, "        end")?;
        writeln!(f, "    end")?;
        writeln!(f, "endmodule")
    }
}

fn write_arm(f: &mut fmt::Formatter<'_>, table: &ControllerTable, arm: &CaseArm) -> fmt::Result {
    match arm.label {
        Label::Key(digit) => writeln!(f, "                {}'d{digit}: begin", table.input_width())?,
        Label::Default => writeln!(f, "                default: begin")?,
    }
    writeln!(f, "                  state <= {}'d{};", table.state_width(), arm.next)?;
    if arm.reset_pulse {
        writeln!(f, "                  if (!reset_flag)")?;
        writeln!(f, "                    begin")?;
        writeln!(f, "                      reset_orig_fsm <= 1'b1;")?;
        writeln!(f, "                      reset_flag <= 1'b1;")?;
        writeln!(f, "                    end")?;
        writeln!(f, "                  else")?;
        writeln!(f, "                    reset_orig_fsm <= 1'b0;")?;
    } else {
        writeln!(f, "                  reset_orig_fsm <= 1'b0;")?;
    }
    writeln!(f, "                  op_vec <= {};", arm.output.to_verilog())?;
    writeln!(f, "                end")
}
